//! ## drillhund-engine::demo
//! **Built-in fallback drill**
//!
//! A fixed, self-contained exercise served whenever retrieval fails or no
//! provider is configured. The session keeps working offline; the service
//! marks it as degraded with an advisory message.

use drillhund_core::events::{
    CaptureRecord, MonitorMetrics, Question, StatusSignal, TaskEvent, TaskSnapshot, TaskUpdate,
};

pub const DEMO_ADVISORY: &str =
    "Could not load task data from the server. Showing the demo drill.";
pub const DEMO_SUBMIT_MESSAGE: &str = "Answer sent (demo). Follow-up events are on their way.";

/// Full demo exercise: three log feeds, a resource monitor, and a capture
/// table telling one exfiltration story.
pub fn demo_snapshot(task_id: &str) -> TaskSnapshot {
    TaskSnapshot {
        id: task_id.to_string(),
        title: "Demo drill: suspicious traffic".into(),
        description: Some("Watch the terminals and answer the question on the right.".into()),
        question: Question {
            id: "demo-question-initial".into(),
            text: "What should you do first?".into(),
            options: vec![
                "Isolate the workstation.".into(),
                "Tell the user about the suspicious traffic.".into(),
                "Ignore the event.".into(),
            ],
        },
        events: vec![
            TaskEvent::log(1, 1.0, "[22s] proxy: GET /login.php").with_title("proxy"),
            TaskEvent::log(2, 4.0, "[25s] siem: data exfiltration rule matched").with_title("siem"),
            TaskEvent::monitor(
                99,
                5.0,
                MonitorMetrics {
                    cpu: 42.0,
                    memory: 68.0,
                    network: Some(12.0),
                },
            )
            .with_title("monitor"),
            TaskEvent::log(1, 7.0, "[28s] proxy: POST /upload.php 2.5MB").with_title("proxy"),
            TaskEvent::monitor(
                99,
                9.0,
                MonitorMetrics {
                    cpu: 58.0,
                    memory: 72.0,
                    network: Some(18.0),
                },
            )
            .with_title("monitor"),
            TaskEvent::capture(
                4,
                10.0,
                CaptureRecord {
                    time: "12:42:15.345".into(),
                    source: "10.0.5.23".into(),
                    destination: "185.213.11.4".into(),
                    protocol: "TLS".into(),
                    info: "Client Hello, SNI: login.example.com".into(),
                },
            )
            .with_title("WireShark"),
            TaskEvent::capture(
                4,
                12.0,
                CaptureRecord {
                    time: "12:42:17.902".into(),
                    source: "185.213.11.4".into(),
                    destination: "10.0.5.23".into(),
                    protocol: "TLS".into(),
                    info: "Server Hello, Certificate, Server Hello Done".into(),
                },
            )
            .with_title("WireShark"),
            TaskEvent::log(3, 11.0, "[33s] edr: suspicious rundll32.exe").with_title("edr"),
        ],
    }
}

/// Follow-up delta played after a demo submission.
pub fn demo_update() -> TaskUpdate {
    TaskUpdate {
        message: Some(DEMO_SUBMIT_MESSAGE.into()),
        status: Some(StatusSignal::Continue),
        status_message: None,
        question: Some(Question {
            id: "demo-question-followup".into(),
            text: "What is the next step?".into(),
            options: vec![
                "Check the state of the remaining hosts.".into(),
                "Tell the user about the possible incident.".into(),
                "Open an escalation ticket for the response team.".into(),
            ],
        }),
        events: vec![
            TaskEvent::log(
                2,
                2.0,
                "SIEM: correlation confirmed for IOC #4453, severity critical",
            )
            .with_title("siem"),
            TaskEvent::monitor(
                99,
                4.0,
                MonitorMetrics {
                    cpu: 63.0,
                    memory: 70.0,
                    network: Some(9.0),
                },
            )
            .with_title("monitor"),
            TaskEvent::capture(
                4,
                5.0,
                CaptureRecord {
                    time: "12:42:18.412".into(),
                    source: "10.0.5.23".into(),
                    destination: "185.213.11.4".into(),
                    protocol: "TLS".into(),
                    info: "Client Key Exchange, Change Cipher Spec".into(),
                },
            )
            .with_title("WireShark"),
            TaskEvent::log(
                1,
                6.0,
                "Proxy: user student01 denied access to the external resource",
            )
            .with_title("proxy"),
        ],
    }
}
