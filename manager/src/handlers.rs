use crate::database::Database;
use crate::error::AppError;
use crate::models::{
    AnswerListResponse, AnswerResponse, CreateAnswerRequest, CreateQuestionRequest,
    QuestionListResponse, QuestionResponse, ServerStatus,
};
use crate::store::BoardStore;
use actix_web::{web, HttpResponse, Result};
use std::sync::Arc;
use std::time::SystemTime;

pub struct AppState {
    pub database: Arc<Database>,
    pub store: Arc<BoardStore>,
    pub start_time: SystemTime,
}

pub async fn health_check(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let uptime = data
        .start_time
        .elapsed()
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    let stats = data.store.stats()?;

    let status = ServerStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime,
        question_subscribers: stats.question_subscribers,
        answer_subscribers: stats.answer_subscribers,
    };
    Ok(HttpResponse::Ok().json(status))
}

pub async fn get_questions(data: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let questions = data.database.get_all_questions()?;
    let response = QuestionListResponse { questions };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn create_question(
    data: web::Data<AppState>,
    request: web::Json<CreateQuestionRequest>,
) -> Result<HttpResponse, AppError> {
    let req = request.into_inner();

    // Validated here so the adapter's own check stays a defensive backstop
    if req.text.trim().is_empty() {
        return Err(AppError::EmptyText);
    }

    let question = data.store.create_question(&req.text)?;

    let response = QuestionResponse { question };
    Ok(HttpResponse::Created().json(response))
}

pub async fn get_answers(
    data: web::Data<AppState>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();

    // 404 for a question the store has never seen
    data.database.get_question_by_id(question_id)?;

    let answers = data.database.get_answers_for_question(question_id)?;
    let response = AnswerListResponse { answers };
    Ok(HttpResponse::Ok().json(response))
}

pub async fn create_answer(
    data: web::Data<AppState>,
    path: web::Path<i64>,
    request: web::Json<CreateAnswerRequest>,
) -> Result<HttpResponse, AppError> {
    let question_id = path.into_inner();
    let req = request.into_inner();

    if req.text.trim().is_empty() {
        return Err(AppError::EmptyText);
    }

    let answer = data.store.create_answer(question_id, &req.text)?;

    let response = AnswerResponse { answer };
    Ok(HttpResponse::Created().json(response))
}
