//! End-to-end panel behavior: one controller per client session, at most
//! one live answer subscription, auto-close on answer submission.

mod common;

use agora_manager::controller::DiscussionController;
use agora_manager::store::QuestionFeed;
use common::TestApp;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;

fn apply_pending_questions(controller: &mut DiscussionController, feed: &mut QuestionFeed) {
    while let Ok(snapshot) = feed.try_recv() {
        controller.apply_questions(snapshot);
    }
}

#[actix_rt::test]
async fn view_orders_questions_newest_first() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("What is X?");
    controller.submit_question("How does Y work?");
    apply_pending_questions(&mut controller, &mut feed);

    let view = controller.view();
    assert_eq!(view.len(), 2);
    assert_eq!(view[0].text, "How does Y work?");
    assert_eq!(view[1].text, "What is X?");
    assert!(view.iter().all(|question| !question.is_open));
    assert!(view.iter().all(|question| question.answers.is_empty()));
}

#[actix_rt::test]
async fn open_panel_submit_answer_then_panel_auto_closes() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("What is X?");
    controller.submit_question("How does Y work?");
    apply_pending_questions(&mut controller, &mut feed);

    let q1_id = controller
        .view()
        .iter()
        .find(|question| question.text == "What is X?")
        .unwrap()
        .id;

    let mut answer_feed = controller.toggle(q1_id).unwrap().expect("answer feed");
    assert_eq!(controller.open_question_id(), Some(q1_id));

    // The initial answer snapshot is empty
    let initial = answer_feed.try_recv().unwrap();
    assert!(controller.apply_answers(initial));
    let view = controller.view();
    let q1_view = view.iter().find(|question| question.id == q1_id).unwrap();
    assert!(q1_view.is_open);
    assert!(q1_view.answers.is_empty());

    controller.submit_answer("X is Z");

    // The panel closed the moment the write was issued, with no
    // confirmation awaited
    assert_eq!(controller.open_question_id(), None);
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 0);

    // The write itself landed
    let answers = test_app.db().get_answers_for_question(q1_id).unwrap();
    assert_eq!(answers.len(), 1);
    assert_eq!(answers[0].text, "X is Z");

    // The snapshot produced by that write was buffered before the
    // cancellation and is dropped as a late delivery
    let late = answer_feed.try_recv().unwrap();
    assert!(!controller.apply_answers(late));
    assert!(controller.view().iter().all(|question| !question.is_open));
}

#[actix_rt::test]
async fn double_toggle_returns_the_panel_to_closed() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("What is X?");
    apply_pending_questions(&mut controller, &mut feed);
    let question_id = controller.view()[0].id;

    let answer_feed = controller.toggle(question_id).unwrap();
    assert!(answer_feed.is_some());
    assert_eq!(controller.open_question_id(), Some(question_id));
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 1);

    assert!(controller.toggle(question_id).unwrap().is_none());
    assert_eq!(controller.open_question_id(), None);
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 0);

    // The cancelled feed drains its buffered snapshot and then reports
    // the sender gone
    let mut answer_feed = answer_feed.unwrap();
    let _ = answer_feed.try_recv();
    assert!(matches!(
        answer_feed.try_recv(),
        Err(TryRecvError::Disconnected)
    ));
}

#[actix_rt::test]
async fn switching_panels_cancels_the_prior_subscription_first() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("What is X?");
    controller.submit_question("How does Y work?");
    apply_pending_questions(&mut controller, &mut feed);

    let view = controller.view();
    let (q2_id, q1_id) = (view[0].id, view[1].id);

    let mut first_feed = controller.toggle(q1_id).unwrap().unwrap();
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 1);

    let _second_feed = controller.toggle(q2_id).unwrap().unwrap();
    assert_eq!(controller.open_question_id(), Some(q2_id));

    // The prior subscription was cancelled before the new one opened, so
    // there is never more than one live
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 1);
    let _ = first_feed.try_recv();
    assert!(matches!(
        first_feed.try_recv(),
        Err(TryRecvError::Disconnected)
    ));

    // And the bound holds across any toggle sequence
    for id in [q1_id, q2_id, q2_id, q1_id] {
        let _ = controller.toggle(id).unwrap();
        assert!(test_app.store().stats().unwrap().answer_subscribers <= 1);
    }
}

#[actix_rt::test]
async fn blank_submissions_are_no_ops() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("   ");
    apply_pending_questions(&mut controller, &mut feed);
    assert!(controller.view().is_empty());
    assert_eq!(test_app.db().get_all_questions().unwrap().len(), 0);

    controller.submit_question("What is X?");
    apply_pending_questions(&mut controller, &mut feed);
    let question_id = controller.view()[0].id;

    let _answer_feed = controller.toggle(question_id).unwrap().unwrap();
    controller.submit_answer(" \t ");

    // A blank answer leaves the panel open and writes nothing
    assert_eq!(controller.open_question_id(), Some(question_id));
    assert_eq!(
        test_app
            .db()
            .get_answers_for_question(question_id)
            .unwrap()
            .len(),
        0
    );
}

#[actix_rt::test]
async fn panel_closes_even_when_the_write_fails() {
    let test_app = TestApp::new();
    let (mut controller, _feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    // Opening a panel for a question the store does not know is allowed;
    // the answer write against it fails
    let _answer_feed = controller.toggle(999).unwrap().unwrap();
    controller.submit_answer("X is Z");

    assert_eq!(controller.open_question_id(), None);
    assert_eq!(test_app.store().stats().unwrap().answer_subscribers, 0);
    assert_eq!(test_app.db().get_all_questions().unwrap().len(), 0);
}

#[actix_rt::test]
async fn unmount_cancels_every_subscription() {
    let test_app = TestApp::new();
    let (mut controller, mut feed) =
        DiscussionController::mount(Arc::clone(test_app.store())).unwrap();

    controller.submit_question("What is X?");
    apply_pending_questions(&mut controller, &mut feed);
    let question_id = controller.view()[0].id;
    let _answer_feed = controller.toggle(question_id).unwrap().unwrap();

    let stats = test_app.store().stats().unwrap();
    assert_eq!(stats.question_subscribers, 1);
    assert_eq!(stats.answer_subscribers, 1);

    controller.unmount();

    let stats = test_app.store().stats().unwrap();
    assert_eq!(stats.question_subscribers, 0);
    assert_eq!(stats.answer_subscribers, 0);
}
