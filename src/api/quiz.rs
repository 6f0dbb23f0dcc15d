use crate::{
    auth::auth::AuthUser,
    model::quiz::{Quiz, QuizAttempt, QuizQuestionRow},
    utils::quiz_grading::{AnswerKey, grade_attempt},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use std::collections::HashMap;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateQuizQuestion {
    #[schema(example = "What is 2 + 2?")]
    pub prompt: String,
    #[schema(example = json!(["3", "4", "5"]))]
    pub options: Vec<String>,
    /// Index into `options`
    #[schema(example = 1)]
    pub correct_option: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct CreateQuiz {
    #[schema(example = 3)]
    pub course_id: u64,
    #[schema(example = "Week 4 checkpoint")]
    pub title: String,
    pub questions: Vec<CreateQuizQuestion>,
}

/// Question as served to callers; `correct_option` is stripped for
/// students so the quiz page cannot leak the key before an attempt.
#[derive(Serialize, ToSchema)]
pub struct QuizQuestionView {
    #[schema(example = 10)]
    pub id: u64,
    #[schema(example = 1)]
    pub position: u32,
    #[schema(example = "What is 2 + 2?")]
    pub prompt: String,
    pub options: Vec<String>,
    #[schema(example = 1, nullable = true)]
    pub correct_option: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizDetailResponse {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuizQuestionView>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct QuizQuery {
    #[schema(example = 1)]
    pub page: Option<u32>,
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    #[schema(example = 3)]
    pub course_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct QuizListResponse {
    pub data: Vec<Quiz>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 4)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct AnswerSubmission {
    #[schema(example = 10)]
    pub question_id: u64,
    #[schema(example = 1)]
    pub selected_option: u32,
}

#[derive(Deserialize, ToSchema)]
pub struct SubmitAttempt {
    pub answers: Vec<AnswerSubmission>,
}

/// Create Quiz with its questions
#[utoipa::path(
    post,
    path = "/api/v1/quizzes",
    request_body = CreateQuiz,
    responses(
        (status = 201, description = "Quiz created", body = Object, example = json!({
            "message": "Quiz created",
            "quiz_id": 1
        })),
        (status = 400, description = "Invalid quiz payload"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz"
)]
pub async fn create_quiz(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateQuiz>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    if payload.title.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "title must not be empty"
        })));
    }
    if payload.questions.is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "A quiz needs at least one question"
        })));
    }
    for (idx, q) in payload.questions.iter().enumerate() {
        if q.options.len() < 2 {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("Question {} needs at least two options", idx + 1)
            })));
        }
        if q.correct_option as usize >= q.options.len() {
            return Ok(HttpResponse::BadRequest().json(json!({
                "message": format!("Question {} has an out-of-range correct_option", idx + 1)
            })));
        }
    }

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let quiz_result = sqlx::query("INSERT INTO quizzes (course_id, title) VALUES (?, ?)")
        .bind(payload.course_id)
        .bind(payload.title.trim())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert quiz");
            ErrorInternalServerError("Internal Server Error")
        })?;

    let quiz_id = quiz_result.last_insert_id();

    for (idx, q) in payload.questions.iter().enumerate() {
        let options_json = serde_json::to_string(&q.options)
            .map_err(actix_web::error::ErrorInternalServerError)?;

        sqlx::query(
            r#"
            INSERT INTO quiz_questions (quiz_id, position, prompt, options_json, correct_option)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(quiz_id)
        .bind((idx + 1) as u32)
        .bind(q.prompt.trim())
        .bind(&options_json)
        .bind(q.correct_option)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, quiz_id, "Failed to insert quiz question");
            ErrorInternalServerError("Internal Server Error")
        })?;
    }

    tx.commit().await.map_err(|e| {
        error!(error = %e, quiz_id, "Failed to commit quiz");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Quiz created",
        "quiz_id": quiz_id
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/quizzes",
    params(QuizQuery),
    responses(
        (status = 200, description = "Paginated quiz list", body = QuizListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz"
)]
pub async fn list_quizzes(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<QuizQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    if query.course_id.is_some() {
        where_sql.push_str(" AND course_id = ?");
    }

    let count_sql = format!("SELECT COUNT(*) FROM quizzes{}", where_sql);
    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(course_id) = query.course_id {
        count_q = count_q.bind(course_id);
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count quizzes");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, course_id, title, status, created_at
        FROM quizzes
        {}
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Quiz>(&data_sql);
    if let Some(course_id) = query.course_id {
        data_q = data_q.bind(course_id);
    }

    let quizzes = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch quiz list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(QuizListResponse {
        data: quizzes,
        page,
        per_page,
        total,
    }))
}

/// Get Quiz with questions
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}",
    params(
        ("quiz_id", Path, description = "Quiz ID")
    ),
    responses(
        (status = 200, description = "Quiz found", body = QuizDetailResponse),
        (status = 404, description = "Quiz not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz"
)]
pub async fn get_quiz(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let quiz_id = path.into_inner();

    let quiz = sqlx::query_as::<_, Quiz>(
        "SELECT id, course_id, title, status, created_at FROM quizzes WHERE id = ?",
    )
    .bind(quiz_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, quiz_id, "Failed to fetch quiz");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(quiz) = quiz else {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Quiz not found"
        })));
    };

    let rows = sqlx::query_as::<_, QuizQuestionRow>(
        r#"
        SELECT id, quiz_id, position, prompt, options_json, correct_option
        FROM quiz_questions
        WHERE quiz_id = ?
        ORDER BY position
        "#,
    )
    .bind(quiz_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, quiz_id, "Failed to fetch quiz questions");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let reveal_key = !auth.is_student();
    let mut questions = Vec::with_capacity(rows.len());
    for row in rows {
        let options: Vec<String> = serde_json::from_str(&row.options_json).map_err(|e| {
            error!(error = %e, question_id = row.id, "Corrupt options payload");
            ErrorInternalServerError("Internal Server Error")
        })?;

        questions.push(QuizQuestionView {
            id: row.id,
            position: row.position,
            prompt: row.prompt,
            options,
            correct_option: reveal_key.then_some(row.correct_option),
        });
    }

    Ok(HttpResponse::Ok().json(QuizDetailResponse { quiz, questions }))
}

/// Submit a quiz attempt (one per student)
#[utoipa::path(
    post,
    path = "/api/v1/quizzes/{quiz_id}/attempts",
    params(
        ("quiz_id", Path, description = "Quiz ID")
    ),
    request_body = SubmitAttempt,
    responses(
        (status = 200, description = "Attempt graded", body = Object, example = json!({
            "score": 80,
            "correct_count": 4,
            "total_questions": 5
        })),
        (status = 404, description = "Quiz not found"),
        (status = 409, description = "Quiz already attempted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz"
)]
pub async fn submit_attempt(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<SubmitAttempt>,
) -> actix_web::Result<impl Responder> {
    let student_id = auth
        .student_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No student profile"))?;

    let quiz_id = path.into_inner();

    let key: Vec<(u64, u32)> = sqlx::query_as(
        "SELECT id, correct_option FROM quiz_questions WHERE quiz_id = ?",
    )
    .bind(quiz_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, quiz_id, "Failed to fetch answer key");
        ErrorInternalServerError("Internal Server Error")
    })?;

    if key.is_empty() {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Quiz not found"
        })));
    }

    let key: Vec<AnswerKey> = key
        .into_iter()
        .map(|(question_id, correct_option)| AnswerKey {
            question_id,
            correct_option,
        })
        .collect();

    let answers: HashMap<u64, u32> = payload
        .answers
        .iter()
        .map(|a| (a.question_id, a.selected_option))
        .collect();

    let graded = grade_attempt(&key, &answers);

    let result = sqlx::query(
        r#"
        INSERT INTO quiz_attempts (quiz_id, student_id, score, correct_count, total_questions)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .bind(graded.score)
    .bind(graded.correct_count)
    .bind(graded.total_questions)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "score": graded.score,
            "correct_count": graded.correct_count,
            "total_questions": graded.total_questions
        }))),
        Err(e) => {
            // one attempt per (quiz, student)
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Quiz already attempted"
                    })));
                }
            }

            error!(error = %e, quiz_id, student_id, "Failed to record attempt");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Fetch the caller's attempt for a quiz
#[utoipa::path(
    get,
    path = "/api/v1/quizzes/{quiz_id}/attempts/me",
    params(
        ("quiz_id", Path, description = "Quiz ID")
    ),
    responses(
        (status = 200, description = "Attempt found", body = QuizAttempt),
        (status = 404, description = "No attempt recorded"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Quiz"
)]
pub async fn my_attempt(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let student_id = auth
        .student_id
        .ok_or_else(|| actix_web::error::ErrorForbidden("No student profile"))?;

    let quiz_id = path.into_inner();

    let attempt = sqlx::query_as::<_, QuizAttempt>(
        r#"
        SELECT id, quiz_id, student_id, score, correct_count, total_questions, submitted_at
        FROM quiz_attempts
        WHERE quiz_id = ? AND student_id = ?
        "#,
    )
    .bind(quiz_id)
    .bind(student_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, quiz_id, student_id, "Failed to fetch attempt");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match attempt {
        Some(a) => Ok(HttpResponse::Ok().json(a)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "No attempt recorded"
        }))),
    }
}
