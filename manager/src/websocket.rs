use crate::controller::DiscussionController;
use crate::handlers::AppState;
use crate::models::QuestionView;
use crate::store::{AnswersSnapshot, QuestionFeed, QuestionsSnapshot};
use actix::prelude::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_stream::wrappers::UnboundedReceiverStream;
use ts_rs::TS;
use uuid::Uuid;

/// Intents a connected client may send.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    SubmitQuestion { text: String },
    SubmitAnswer { text: String },
    Toggle { question_id: i64 },
    Ping,
}

/// Messages pushed to a connected client.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    Connected { client_id: String },
    View { questions: Vec<QuestionView> },
    Error { message: String },
    Pong,
}

/// One client's WebSocket session.
///
/// Each session owns its own `DiscussionController`: the controller is
/// mounted when the connection starts and unmounted when it stops, so all
/// subscription state is created and torn down with the connection.
pub struct BoardSession {
    /// Client ID for this connection
    client_id: String,
    /// Last heartbeat time
    hb: Instant,
    controller: DiscussionController,
    /// Question feed handed to the actor's stream loop in `started`
    questions: Option<QuestionFeed>,
}

impl BoardSession {
    pub fn new(controller: DiscussionController, questions: QuestionFeed) -> Self {
        Self {
            client_id: Uuid::new_v4().to_string(),
            hb: Instant::now(),
            controller,
            questions: Some(questions),
        }
    }

    /// Send heartbeat ping to client
    fn hb(&self, ctx: &mut <Self as Actor>::Context) {
        ctx.run_interval(Duration::from_secs(30), |act, ctx| {
            // Check if client has sent pong back within 10 seconds
            if Instant::now().duration_since(act.hb) > Duration::from_secs(10) {
                tracing::warn!(
                    "Board client {} failed heartbeat, disconnecting",
                    act.client_id
                );
                ctx.stop();
                return;
            }

            ctx.ping(b"");
        });
    }

    fn handle_client_message(&mut self, message: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match message {
            ClientMessage::SubmitQuestion { text } => {
                // No optimistic insert; the new question arrives via the feed
                self.controller.submit_question(&text);
            }
            ClientMessage::SubmitAnswer { text } => {
                // The panel auto-closes on submit, so the view changes now
                self.controller.submit_answer(&text);
                self.push_view(ctx);
            }
            ClientMessage::Toggle { question_id } => {
                match self.controller.toggle(question_id) {
                    Ok(Some(feed)) => {
                        ctx.add_stream(UnboundedReceiverStream::new(feed));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!("Failed to open answer feed: {e}");
                        self.send_json(
                            ctx,
                            &ServerMessage::Error {
                                message: format!("Failed to open answers: {e}"),
                            },
                        );
                    }
                }
                self.push_view(ctx);
            }
            ClientMessage::Ping => {
                self.send_json(ctx, &ServerMessage::Pong);
            }
        }
    }

    fn push_view(&self, ctx: &mut ws::WebsocketContext<Self>) {
        self.send_json(
            ctx,
            &ServerMessage::View {
                questions: self.controller.view(),
            },
        );
    }

    fn send_json(&self, ctx: &mut ws::WebsocketContext<Self>, message: &ServerMessage) {
        if let Ok(json) = serde_json::to_string(message) {
            ctx.text(json);
        }
    }
}

impl Actor for BoardSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!("Board session started: {}", self.client_id);

        // Start heartbeat
        self.hb(ctx);

        // Consume the question feed for the lifetime of the session
        if let Some(feed) = self.questions.take() {
            ctx.add_stream(UnboundedReceiverStream::new(feed));
        }

        self.send_json(
            ctx,
            &ServerMessage::Connected {
                client_id: self.client_id.clone(),
            },
        );
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        tracing::info!("Board session stopping: {}", self.client_id);

        // Tear down every live subscription with the connection
        self.controller.unmount();

        Running::Stop
    }
}

impl StreamHandler<QuestionsSnapshot> for BoardSession {
    fn handle(&mut self, snapshot: QuestionsSnapshot, ctx: &mut Self::Context) {
        self.controller.apply_questions(snapshot);
        self.push_view(ctx);
    }

    fn finished(&mut self, _: &mut Self::Context) {
        // The feed closes when its subscription is cancelled; the session
        // itself stays up.
    }
}

impl StreamHandler<AnswersSnapshot> for BoardSession {
    fn handle(&mut self, snapshot: AnswersSnapshot, ctx: &mut Self::Context) {
        // Late deliveries from a cancelled subscription are dropped here
        if self.controller.apply_answers(snapshot) {
            self.push_view(ctx);
        }
    }

    fn finished(&mut self, _: &mut Self::Context) {}
}

/// Handle incoming WebSocket messages
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for BoardSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(message) => self.handle_client_message(message, ctx),
                    Err(e) => {
                        tracing::warn!("Failed to parse client message: {}", e);
                        self.send_json(
                            ctx,
                            &ServerMessage::Error {
                                message: format!("Invalid message format: {e}"),
                            },
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::debug!("Binary message received (ignored)");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!("WebSocket connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

/// WebSocket endpoint handler
pub async fn websocket_handler(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    tracing::debug!("WebSocket connection request received");

    let (controller, questions) = DiscussionController::mount(Arc::clone(&data.store))?;
    ws::start(BoardSession::new(controller, questions), &req, stream)
}
