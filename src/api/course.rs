use crate::{
    auth::auth::AuthUser,
    model::{course::Course, student::Student},
    utils::db_utils::{build_update_sql, execute_update},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

const UPDATABLE_COLUMNS: &[&str] = &[
    "course_code",
    "title",
    "description",
    "instructor_id",
    "status",
];

#[derive(Deserialize, ToSchema)]
pub struct CreateCourse {
    #[schema(example = "MATH-101")]
    pub course_code: String,
    #[schema(example = "Introductory Algebra")]
    pub title: String,
    #[schema(example = "First-semester algebra course")]
    pub description: Option<String>,
    #[schema(example = 12)]
    pub instructor_id: Option<u64>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct CourseQuery {
    /// Pagination page number (start with 1)
    #[schema(example = 1)]
    pub page: Option<u32>,
    /// Pagination per page number
    #[schema(example = 20)]
    pub per_page: Option<u32>,
    /// Filter by instructor
    #[schema(example = 12)]
    pub instructor_id: Option<u64>,
    /// Filter by status
    #[schema(example = "active")]
    pub status: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CourseListResponse {
    pub data: Vec<Course>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 8)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct EnrollRequest {
    #[schema(example = 7)]
    pub student_id: u64,
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

/// Create Course
#[utoipa::path(
    post,
    path = "/api/v1/courses",
    request_body = CreateCourse,
    responses(
        (status = 201, description = "Course created successfully"),
        (status = 409, description = "Course code already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn create_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCourse>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    if payload.course_code.trim().is_empty() || payload.title.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(json!({
            "message": "course_code and title must not be empty"
        })));
    }

    let result = sqlx::query(
        r#"
        INSERT INTO courses (course_code, title, description, instructor_id)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(payload.course_code.trim())
    .bind(payload.title.trim())
    .bind(&payload.description)
    .bind(payload.instructor_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => Ok(HttpResponse::Created().json(json!({
            "message": "Course created successfully"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "Course code already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to create course");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    params(CourseQuery),
    responses(
        (status = 200, description = "Paginated course list", body = CourseListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn list_courses(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    query: web::Query<CourseQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let mut where_sql = String::from(" WHERE 1=1");
    let mut args: Vec<FilterValue> = Vec::new();

    if let Some(instructor_id) = query.instructor_id {
        where_sql.push_str(" AND instructor_id = ?");
        args.push(FilterValue::U64(instructor_id));
    }

    if let Some(status) = query.status.as_deref() {
        where_sql.push_str(" AND status = ?");
        args.push(FilterValue::Str(status));
    }

    let count_sql = format!("SELECT COUNT(*) FROM courses{}", where_sql);
    debug!(sql = %count_sql, "Counting courses");

    let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
    for arg in &args {
        count_q = match arg {
            FilterValue::U64(v) => count_q.bind(*v),
            FilterValue::Str(s) => count_q.bind(*s),
        };
    }

    let total = count_q.fetch_one(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to count courses");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let data_sql = format!(
        r#"
        SELECT id, course_code, title, description, instructor_id, status
        FROM courses
        {}
        ORDER BY id DESC
        LIMIT ? OFFSET ?
        "#,
        where_sql
    );

    let mut data_q = sqlx::query_as::<_, Course>(&data_sql);
    for arg in args {
        data_q = match arg {
            FilterValue::U64(v) => data_q.bind(v),
            FilterValue::Str(s) => data_q.bind(s),
        };
    }

    let courses = data_q
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch course list");
            ErrorInternalServerError("Internal Server Error")
        })?;

    Ok(HttpResponse::Ok().json(CourseListResponse {
        data: courses,
        page,
        per_page,
        total,
    }))
}

/// Get Course by ID
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}",
    params(
        ("course_id", Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Course found", body = Course),
        (status = 404, description = "Course not found"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn get_course(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let course_id = path.into_inner();

    let course = sqlx::query_as::<_, Course>(
        r#"
        SELECT id, course_code, title, description, instructor_id, status
        FROM courses
        WHERE id = ?
        "#,
    )
    .bind(course_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, course_id, "Failed to fetch course");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match course {
        Some(c) => Ok(HttpResponse::Ok().json(c)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Course not found"
        }))),
    }
}

/// Update Course
#[utoipa::path(
    put,
    path = "/api/v1/courses/{course_id}",
    params(
        ("course_id", Path, description = "Course ID")
    ),
    request_body = Object,
    responses(
        (status = 200, description = "Course updated successfully"),
        (status = 400, description = "Invalid update payload"),
        (status = 404, description = "Course not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn update_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let course_id = path.into_inner();

    let update = build_update_sql("courses", UPDATABLE_COLUMNS, &body, "id", course_id)?;

    let affected = execute_update(pool.get_ref(), update)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    if affected == 0 {
        return Ok(HttpResponse::NotFound().body("Course not found"));
    }

    Ok(HttpResponse::Ok().body("Course updated successfully"))
}

/// Delete Course
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{course_id}",
    params(
        ("course_id", Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Course not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn delete_course(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<i64>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let course_id = path.into_inner();

    let result = sqlx::query("DELETE FROM courses WHERE id = ?")
        .bind(course_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(res) => {
            if res.rows_affected() == 0 {
                return Ok(HttpResponse::NotFound().json(json!({
                    "message": "Course not found"
                })));
            }

            Ok(HttpResponse::Ok().json(json!({
                "message": "Successfully deleted"
            })))
        }
        Err(e) => {
            error!(error = %e, course_id, "Failed to delete course");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Enroll a student into a course
#[utoipa::path(
    post,
    path = "/api/v1/courses/{course_id}/enroll",
    params(
        ("course_id", Path, description = "Course ID")
    ),
    request_body = EnrollRequest,
    responses(
        (status = 200, description = "Student enrolled", body = Object, example = json!({
            "message": "Student enrolled"
        })),
        (status = 404, description = "Course or student not found"),
        (status = 409, description = "Already enrolled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn enroll_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<EnrollRequest>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let course_id = path.into_inner();

    let result = sqlx::query("INSERT INTO enrollments (course_id, student_id) VALUES (?, ?)")
        .bind(course_id)
        .bind(payload.student_id)
        .execute(pool.get_ref())
        .await;

    match result {
        Ok(_) => Ok(HttpResponse::Ok().json(json!({
            "message": "Student enrolled"
        }))),
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                match db_err.code().as_deref() {
                    // duplicate enrollment
                    Some("23000") => {
                        return Ok(HttpResponse::Conflict().json(json!({
                            "message": "Student already enrolled"
                        })));
                    }
                    _ => {}
                }
            }

            error!(error = %e, course_id, student_id = payload.student_id, "Enroll failed");
            Ok(HttpResponse::InternalServerError().json(json!({
                "message": "Internal Server Error"
            })))
        }
    }
}

/// Remove a student from a course
#[utoipa::path(
    delete,
    path = "/api/v1/courses/{course_id}/enroll/{student_id}",
    params(
        ("course_id", Path, description = "Course ID"),
        ("student_id", Path, description = "Student ID")
    ),
    responses(
        (status = 200, description = "Enrollment removed"),
        (status = 404, description = "Enrollment not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn unenroll_student(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<(u64, u64)>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let (course_id, student_id) = path.into_inner();

    let result = sqlx::query("DELETE FROM enrollments WHERE course_id = ? AND student_id = ?")
        .bind(course_id)
        .bind(student_id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, course_id, student_id, "Unenroll failed");
            ErrorInternalServerError("Internal Server Error")
        })?;

    if result.rows_affected() == 0 {
        return Ok(HttpResponse::NotFound().json(json!({
            "message": "Enrollment not found"
        })));
    }

    Ok(HttpResponse::Ok().json(json!({
        "message": "Enrollment removed"
    })))
}

/// List students enrolled in a course
#[utoipa::path(
    get,
    path = "/api/v1/courses/{course_id}/students",
    params(
        ("course_id", Path, description = "Course ID")
    ),
    responses(
        (status = 200, description = "Enrolled students", body = [Student]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Course"
)]
pub async fn list_course_students(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_instructor_or_admin()?;

    let course_id = path.into_inner();

    let students = sqlx::query_as::<_, Student>(
        r#"
        SELECT s.id, s.student_code, s.first_name, s.last_name, s.email, s.phone,
               s.enrolled_date, s.status
        FROM students s
        INNER JOIN enrollments e ON e.student_id = s.id
        WHERE e.course_id = ?
        ORDER BY s.last_name, s.first_name
        "#,
    )
    .bind(course_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, course_id, "Failed to list enrolled students");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(students))
}
