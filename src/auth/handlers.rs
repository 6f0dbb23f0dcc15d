use crate::{
    auth::{
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    models::{LoginReqDto, TokenType, UserReq, UserSql},
    utils::{reset_limiter::ResetLimiter, username_lookup},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

fn password_meets_minimum(password: &str) -> bool {
    password.len() >= MIN_PASSWORD_LEN
}

/// Inserts a new account and keeps the availability lookups warm.
/// Self-registered accounts always start as Student (the column default);
/// role elevation is an administrative operation, never a request input.
async fn insert_user(username: &str, password: &str, pool: &MySqlPool) -> Result<(), HttpResponse> {
    let hashed = hash_password(password);

    let result = sqlx::query("INSERT INTO users (username, password) VALUES (?, ?)")
        .bind(username)
        .bind(&hashed)
        .execute(pool)
        .await;

    match result {
        Ok(_) => {
            username_lookup::mark_taken(username).await;
            Ok(())
        }
        Err(e) => {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Err(HttpResponse::Conflict().json(json!({
                        "error": "Username already exists"
                    })));
                }
            }

            error!(error = %e, "Failed to register user");
            Err(HttpResponse::InternalServerError().json(json!({
                "error": "Failed to register user"
            })))
        }
    }
}

/// true  => username AVAILABLE
/// false => username TAKEN
pub async fn is_username_available(username: &str, pool: &MySqlPool) -> bool {
    let username = username.to_lowercase();

    // Cuckoo filter gives a definite negative without touching the DB
    if !username_lookup::might_exist(&username) {
        return true;
    }

    // Cache gives a fast positive
    if username_lookup::is_known_taken(&username).await {
        return false;
    }

    // Database fallback
    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ? LIMIT 1)",
    )
    .bind(&username)
    .fetch_one(pool)
    .await
    .unwrap_or(true); // fail-safe

    !exists
}

/// Account registration handler
pub async fn register(user: web::Json<UserReq>, pool: web::Data<MySqlPool>) -> impl Responder {
    let username = user.username.trim();
    let password = &user.password;

    if username.is_empty() || password.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Username and password must not be empty"
        }));
    }

    if !password_meets_minimum(password) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Password must be at least 8 characters"
        }));
    }

    if !is_username_available(&user.username, pool.get_ref()).await {
        return HttpResponse::Conflict().json(json!({
            "error": "Username already taken"
        }));
    }

    match insert_user(username, password, pool.get_ref()).await {
        Ok(_) => HttpResponse::Created().json(json!({
            "message": "User registered successfully"
        })),
        Err(err_resp) => err_resp,
    }
}

#[derive(Serialize, Deserialize)]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, student_id
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(&user.username)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    debug!("Password verified");

    let access_token = generate_access_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        db_user.student_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    let (refresh_token, refresh_claims) = generate_refresh_token(
        db_user.id,
        db_user.username.clone(),
        db_user.role_id,
        db_user.student_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    debug!(
        user_id = db_user.id,
        jti = %refresh_claims.jti,
        "Storing refresh token"
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(db_user.id)
    .bind(&refresh_claims.jti)
    .bind(refresh_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE username = ?")
        .bind(&user.username)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to update last_login_at");
        // intentionally not failing login
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::Unauthorized().body("No token"),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::Unauthorized().body("Invalid token"),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::Unauthorized().finish(),
    };

    if claims.token_type != TokenType::Refresh {
        return HttpResponse::Unauthorized().finish();
    }

    // find refresh token in DB
    let record = match sqlx::query_as::<_, (u64, u64, i8)>(
        "SELECT id, user_id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let (record_id, record_user_id) = match record {
        Some((id, user_id, revoked)) if revoked == 0 => (id, user_id),
        _ => return HttpResponse::Unauthorized().finish(),
    };

    // revoke old refresh token
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // issue new refresh token
    let (new_refresh_token, new_claims) = generate_refresh_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        claims.student_id,
        &config.jwt_secret,
        config.refresh_token_ttl,
    );

    if let Err(e) = sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(record_user_id)
    .bind(&new_claims.jti)
    .bind(new_claims.exp as i64)
    .execute(pool.get_ref())
    .await
    {
        error!(error = %e, "Failed to store rotated refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    // new access token
    let access_token = generate_access_token(
        claims.user_id,
        claims.sub.clone(),
        claims.role,
        claims.student_id,
        &config.jwt_secret,
        config.access_token_ttl,
    );

    HttpResponse::Ok().json(json!({
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let header = match req.headers().get("Authorization") {
        Some(h) => h.to_str().unwrap_or(""),
        None => return HttpResponse::NoContent().finish(),
    };

    let token = match header.strip_prefix("Bearer ") {
        Some(t) => t,
        None => return HttpResponse::NoContent().finish(),
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return HttpResponse::NoContent().finish(),
    };

    // only refresh tokens can logout
    if claims.token_type != TokenType::Refresh {
        return HttpResponse::NoContent().finish();
    }

    // revoke refresh token (idempotent)
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await;

    // success (even if token didn't exist)
    HttpResponse::NoContent().finish()
}

#[derive(Deserialize)]
pub struct ForgotPasswordReq {
    pub username: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordReq {
    pub token: String,
    pub new_password: String,
}

/// Issues a single-use, expiring reset token. Delivery is handled outside
/// this service; the response never reveals whether the account exists.
pub async fn forgot_password(
    payload: web::Json<ForgotPasswordReq>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
    limiter: web::Data<ResetLimiter>,
) -> impl Responder {
    let username = payload.username.trim();
    if username.is_empty() {
        return HttpResponse::BadRequest().json(json!({
            "error": "Username must not be empty"
        }));
    }

    if !limiter.try_acquire(username).await {
        info!(username, "Password reset throttled");
        return HttpResponse::TooManyRequests().json(json!({
            "error": "Too many reset requests, try again later"
        }));
    }

    let user_id = match sqlx::query_scalar::<_, u64>("SELECT id FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool.get_ref())
        .await
    {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Failed to look up account for reset");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Some(user_id) = user_id {
        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now().timestamp() + config.reset_token_ttl_secs;

        if let Err(e) = sqlx::query(
            r#"
            INSERT INTO password_resets (user_id, token, expires_at)
            VALUES (?, ?, FROM_UNIXTIME(?))
            "#,
        )
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .execute(pool.get_ref())
        .await
        {
            error!(error = %e, user_id, "Failed to store reset token");
            return HttpResponse::InternalServerError().finish();
        }

        info!(user_id, "Password reset token issued");
    } else {
        debug!("Password reset requested for unknown account");
    }

    HttpResponse::Ok().json(json!({
        "message": "If the account exists, a reset token has been issued"
    }))
}

/// Consumes a reset token and replaces the account password.
pub async fn reset_password(
    payload: web::Json<ResetPasswordReq>,
    pool: web::Data<MySqlPool>,
) -> impl Responder {
    if payload.token.trim().is_empty() || !password_meets_minimum(&payload.new_password) {
        return HttpResponse::BadRequest().json(json!({
            "error": "Token required and password must be at least 8 characters"
        }));
    }

    let record = match sqlx::query_as::<_, (u64, u64)>(
        r#"
        SELECT id, user_id
        FROM password_resets
        WHERE token = ? AND used = 0 AND expires_at > NOW()
        "#,
    )
    .bind(payload.token.trim())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up reset token");
            return HttpResponse::InternalServerError().finish();
        }
    };

    let Some((reset_id, user_id)) = record else {
        return HttpResponse::BadRequest().json(json!({
            "error": "Invalid or expired reset token"
        }));
    };

    let hashed = hash_password(&payload.new_password);

    if let Err(e) = sqlx::query("UPDATE users SET password = ? WHERE id = ?")
        .bind(&hashed)
        .bind(user_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, user_id, "Failed to update password");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE password_resets SET used = 1 WHERE id = ?")
        .bind(reset_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to mark reset token used");
        return HttpResponse::InternalServerError().finish();
    }

    // existing sessions should not survive a password reset
    let _ = sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ?")
        .bind(user_id)
        .execute(pool.get_ref())
        .await;

    info!(user_id, "Password reset completed");

    HttpResponse::Ok().json(json!({
        "message": "Password updated successfully"
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_payload_cannot_carry_a_role() {
        // a role_id smuggled into the body is dropped at deserialization;
        // the insert path has no role input at all
        let req: UserReq = serde_json::from_str(
            r#"{"username":"mallory","password":"longenough1","role_id":1}"#,
        )
        .unwrap();
        assert_eq!(req.username, "mallory");
        assert_eq!(req.password, "longenough1");
    }

    #[test]
    fn password_minimum_applies() {
        assert!(!password_meets_minimum(""));
        assert!(!password_meets_minimum("short"));
        assert!(!password_meets_minimum("seven77"));
        assert!(password_meets_minimum("eight888"));
    }
}
