//! Live mode: turning a stream of events into incremental UI updates.

mod controller;
pub mod sink;

pub use controller::LiveController;
pub use sink::{rendered_text, UiDelta, UiSink};

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::events::Event;
    use proptest::prelude::*;
    use serde_json::json;

    #[derive(Debug, Clone)]
    enum Step {
        Begin,
        Abort,
        Feed(Event),
    }

    fn arb_id() -> impl Strategy<Value = String> {
        prop_oneof![Just("a".to_string()), Just("b".to_string()), Just("c".to_string())]
    }

    fn arb_event() -> impl Strategy<Value = Event> {
        prop_oneof![
            (proptest::option::of(arb_id()), "[a-z ]{0,8}")
                .prop_map(|(message_id, text)| Event::MessageDelta { message_id, text }),
            (proptest::option::of(arb_id()), "[a-z ]{0,8}")
                .prop_map(|(message_id, text)| Event::MessageComplete { message_id, text }),
            (arb_id(), prop_oneof![Just("bash"), Just("view"), Just("report_intent")]).prop_map(
                |(call_id, name)| Event::ToolStart {
                    call_id,
                    tool_name: name.to_string(),
                    arguments: json!({"path": "src/lib.rs", "command": "ls"}),
                }
            ),
            (arb_id(), any::<bool>()).prop_map(|(call_id, success)| Event::ToolComplete {
                call_id,
                success,
                result: Some("out".into()),
                error: None,
            }),
            arb_id().prop_map(|m| Event::ModelChanged { new_model: m }),
            proptest::option::of(arb_id()).prop_map(|model| Event::Usage {
                model,
                input_tokens: None,
                output_tokens: None,
            }),
            Just(Event::Idle),
            Just(Event::Error {
                message: "boom".into()
            }),
            Just(Event::Unrecognized {
                event_type: "future.kind".into()
            }),
        ]
    }

    fn arb_step() -> impl Strategy<Value = Step> {
        prop_oneof![
            1 => Just(Step::Begin),
            1 => Just(Step::Abort),
            6 => arb_event().prop_map(Step::Feed),
        ]
    }

    proptest! {
        #[test]
        fn test_never_two_open_messages(steps in proptest::collection::vec(arb_step(), 0..60)) {
            let mut controller = LiveController::default();
            let mut sink: Vec<UiDelta> = Vec::new();
            for step in steps {
                match step {
                    Step::Begin => {
                        let was_streaming = controller.is_streaming();
                        let result = controller.begin(&mut sink);
                        prop_assert_eq!(result.is_err(), was_streaming);
                    }
                    Step::Abort => controller.note_abort(),
                    Step::Feed(event) => controller.handle(&event, &mut sink),
                }
            }

            // Every open is followed by exactly one completion before the next open.
            let mut open = false;
            for delta in &sink {
                match delta {
                    UiDelta::OpenMessage { .. } => {
                        prop_assert!(!open);
                        open = true;
                    }
                    UiDelta::GenerationComplete => {
                        prop_assert!(open);
                        open = false;
                    }
                    _ => {}
                }
            }
            prop_assert_eq!(open, controller.is_streaming());
        }

        #[test]
        fn test_internal_tools_never_surface(steps in proptest::collection::vec(arb_event(), 0..40)) {
            let mut controller = LiveController::default();
            let mut sink: Vec<UiDelta> = Vec::new();
            controller.begin(&mut sink).unwrap();
            for event in &steps {
                controller.handle(event, &mut sink);
            }
            for delta in &sink {
                if let UiDelta::SetToolStatus { execution, .. } = delta {
                    prop_assert_ne!(execution.tool_name.as_str(), "report_intent");
                }
            }
        }

        #[test]
        fn test_bubble_matches_finished_message(
            steps in proptest::collection::vec(
                (proptest::option::of(arb_id()), "[a-z ]{0,6}", any::<bool>()),
                0..24,
            ),
        ) {
            let mut controller = LiveController::default();
            let mut sink: Vec<UiDelta> = Vec::new();
            let id = controller.begin(&mut sink).unwrap();
            for (message_id, text, is_complete) in steps {
                let event = if is_complete {
                    Event::MessageComplete { message_id, text }
                } else {
                    Event::MessageDelta { message_id, text }
                };
                controller.handle(&event, &mut sink);
            }
            controller.handle(&Event::Idle, &mut sink);

            let finished = controller.take_finished().unwrap();
            prop_assert_eq!(rendered_text(&sink, &id), Some(finished.text));
        }

        #[test]
        fn test_single_segment_full_text_wins(
            chunks in proptest::collection::vec("[a-z ]{0,6}", 0..8),
            full in "[a-z ]{1,12}",
        ) {
            let mut controller = LiveController::default();
            let mut sink: Vec<UiDelta> = Vec::new();
            let id = controller.begin(&mut sink).unwrap();
            for chunk in chunks {
                controller.handle(
                    &Event::MessageDelta { message_id: Some("r1".into()), text: chunk },
                    &mut sink,
                );
            }
            controller.handle(
                &Event::MessageComplete { message_id: Some("r1".into()), text: full.clone() },
                &mut sink,
            );
            prop_assert_eq!(rendered_text(&sink, &id), Some(full));
        }
    }
}
