use crate::{
    api::{attendance, course, quiz, student},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let per_ms = if requests_per_min == 0 {
            1
        } else {
            60_000 / requests_per_min as u64
        };
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond(per_ms)
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .unwrap();
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            )
            // per-account throttling happens inside the handler; the
            // per-IP limiter here is the outer guard
            .service(
                web::resource("/forgot-password")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::forgot_password)),
            )
            .service(
                web::resource("/reset-password")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::reset_password)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .service(
                web::scope("/students")
                    // /students
                    .service(
                        web::resource("")
                            .route(web::post().to(student::create_student))
                            .route(web::get().to(student::list_students)),
                    )
                    // /students/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(student::get_student))
                            .route(web::put().to(student::update_student))
                            .route(web::delete().to(student::delete_student)),
                    ),
            )
            .service(
                web::scope("/courses")
                    // /courses
                    .service(
                        web::resource("")
                            .route(web::post().to(course::create_course))
                            .route(web::get().to(course::list_courses)),
                    )
                    // /courses/{id}
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(course::get_course))
                            .route(web::put().to(course::update_course))
                            .route(web::delete().to(course::delete_course)),
                    )
                    // /courses/{id}/enroll
                    .service(
                        web::resource("/{id}/enroll")
                            .route(web::post().to(course::enroll_student)),
                    )
                    // /courses/{id}/enroll/{student_id}
                    .service(
                        web::resource("/{id}/enroll/{student_id}")
                            .route(web::delete().to(course::unenroll_student)),
                    )
                    // /courses/{id}/students
                    .service(
                        web::resource("/{id}/students")
                            .route(web::get().to(course::list_course_students)),
                    ),
            )
            .service(
                web::scope("/quizzes")
                    // /quizzes
                    .service(
                        web::resource("")
                            .route(web::post().to(quiz::create_quiz))
                            .route(web::get().to(quiz::list_quizzes)),
                    )
                    // /quizzes/{id}
                    .service(web::resource("/{id}").route(web::get().to(quiz::get_quiz)))
                    // /quizzes/{id}/attempts
                    .service(
                        web::resource("/{id}/attempts")
                            .route(web::post().to(quiz::submit_attempt)),
                    )
                    // /quizzes/{id}/attempts/me
                    .service(
                        web::resource("/{id}/attempts/me")
                            .route(web::get().to(quiz::my_attempt)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::post().to(attendance::mark_attendance)),
                    )
                    // /attendance/summary
                    .service(
                        web::resource("/summary")
                            .route(web::get().to(attendance::attendance_summary)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /refresh with refresh_token
//       └─ returns new access_token
