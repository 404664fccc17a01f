//! Connection loop: frames in, timers in between, reload on unclean close.

use std::cell::RefCell;
use std::future::Future;

use web_time::Instant;

use crate::error::PreviewError;
use crate::message::InboundMessage;
use crate::preview::{Preview, PreviewHost};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// One UTF-8 JSON frame, text or binary.
    Frame(Vec<u8>),
    Closed { clean: bool },
}

/// An open connection to the preview server.
pub trait Connection {
    /// The next event. Must be cancel-safe: the loop drops it when a timer
    /// fires first.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent>;
}

pub trait Connector {
    type Conn: Connection;

    fn connect(&self) -> impl Future<Output = Result<Self::Conn, PreviewError>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection cleanly.
    Closed,
    /// The connection dropped; the view must be rebuilt.
    Reload,
}

/// Drive one connection until it closes.
///
/// Frames are handled strictly in arrival order. While waiting, the loop
/// wakes up for the preview's next timer.
pub async fn run_session<C, H>(mut conn: C, preview: &RefCell<Preview>, host: &RefCell<H>) -> SessionEnd
where
    C: Connection,
    H: PreviewHost,
{
    loop {
        let deadline = preview.borrow().next_deadline();
        let event = match deadline {
            Some(deadline) => {
                let wait = deadline.saturating_duration_since(Instant::now());
                n0_future::future::or(async { Some(conn.next_event().await) }, async {
                    n0_future::time::sleep(wait).await;
                    None
                })
                .await
            }
            None => Some(conn.next_event().await),
        };

        let now = Instant::now();
        match event {
            None => preview.borrow_mut().poll_timers(&mut *host.borrow_mut(), now),
            Some(TransportEvent::Frame(frame)) => match InboundMessage::decode(&frame) {
                Ok(message) => {
                    preview
                        .borrow_mut()
                        .handle_message(message, &mut *host.borrow_mut(), now);
                }
                Err(err) => {
                    tracing::warn!(target: "peek::transport", error = %err, bytes = frame.len(), "dropping frame");
                }
            },
            Some(TransportEvent::Closed { clean: true }) => {
                tracing::info!(target: "peek::transport", "connection closed");
                return SessionEnd::Closed;
            }
            Some(TransportEvent::Closed { clean: false }) => {
                tracing::warn!(target: "peek::transport", "connection lost, reloading");
                return SessionEnd::Reload;
            }
        }
    }
}

/// Rebuild the preview from scratch, carrying the session snapshot over the
/// same store a page reload would.
pub fn reload<H: PreviewHost>(preview: &RefCell<Preview>, host: &RefCell<H>) {
    let mut preview = preview.borrow_mut();
    let mut host = host.borrow_mut();
    preview.save_session(&mut *host);
    host.reset();

    let mut fresh = Preview::new(preview.config().clone());
    fresh.attach(&mut *host);
    fresh.restore_session(&mut *host, Instant::now());
    *preview = fresh;
}

/// Connect, run, and reconnect after every unclean close.
pub async fn run_supervised<C, H>(
    connector: &C,
    preview: &RefCell<Preview>,
    host: &RefCell<H>,
) -> Result<(), PreviewError>
where
    C: Connector,
    H: PreviewHost,
{
    loop {
        let conn = connector.connect().await?;
        tracing::debug!(target: "peek::transport", "connected");
        match run_session(conn, preview, host).await {
            SessionEnd::Closed => return Ok(()),
            SessionEnd::Reload => reload(preview, host),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::VecDeque;
    use std::time::Duration;

    use super::*;
    use crate::settings::PreviewConfig;
    use crate::test_support::FakeHost;

    #[derive(Debug, Clone)]
    enum Step {
        Event(TransportEvent),
        Wait(Duration),
    }

    struct Scripted {
        steps: VecDeque<Step>,
    }

    impl Connection for Scripted {
        async fn next_event(&mut self) -> TransportEvent {
            loop {
                match self.steps.front().cloned() {
                    Some(Step::Wait(delay)) => {
                        tokio::time::sleep(delay).await;
                        self.steps.pop_front();
                    }
                    Some(Step::Event(event)) => {
                        self.steps.pop_front();
                        return event;
                    }
                    None => return TransportEvent::Closed { clean: true },
                }
            }
        }
    }

    struct ScriptedConnector {
        scripts: RefCell<VecDeque<Vec<Step>>>,
        connects: Cell<usize>,
    }

    impl ScriptedConnector {
        fn new(scripts: Vec<Vec<Step>>) -> Self {
            Self {
                scripts: RefCell::new(scripts.into()),
                connects: Cell::new(0),
            }
        }
    }

    impl Connector for ScriptedConnector {
        type Conn = Scripted;

        async fn connect(&self) -> Result<Scripted, PreviewError> {
            self.connects.set(self.connects.get() + 1);
            let steps = self
                .scripts
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| PreviewError::Transport("refused".to_string()))?;
            Ok(Scripted {
                steps: steps.into(),
            })
        }
    }

    fn frame(json: &str) -> Step {
        Step::Event(TransportEvent::Frame(json.as_bytes().to_vec()))
    }

    fn parts() -> (RefCell<Preview>, RefCell<FakeHost>) {
        (
            RefCell::new(Preview::new(PreviewConfig::new("localhost:1"))),
            RefCell::new(FakeHost::new(400.0)),
        )
    }

    #[tokio::test]
    async fn test_unclean_close_reloads() {
        let connector = ScriptedConnector::new(vec![
            vec![
                frame(r#"{"action":"base","base":"file:///doc/"}"#),
                frame(
                    r#"{"action":"show","html":"<p data-line-begin=\"1\">a</p><p data-line-begin=\"2\">b</p>","lcount":3}"#,
                ),
                frame("not json"),
                frame(r#"{"action":"scroll","line":2}"#),
                Step::Event(TransportEvent::Closed { clean: false }),
            ],
            vec![Step::Event(TransportEvent::Closed { clean: true })],
        ]);
        let (preview, host) = parts();

        run_supervised(&connector, &preview, &host).await.unwrap();

        assert_eq!(connector.connects.get(), 2);
        assert_eq!(host.borrow().resets, 1);
        let preview = preview.borrow();
        assert_eq!(preview.base(), "file:///doc/");
        assert_eq!(preview.lcount(), Some(3));
        assert_eq!(preview.blocks().len(), 2);
        assert_eq!(preview.snapshot().line, Some(2));
    }

    #[tokio::test]
    async fn test_refused_reconnect_is_an_error() {
        let connector = ScriptedConnector::new(vec![vec![Step::Event(TransportEvent::Closed {
            clean: false,
        })]]);
        let (preview, host) = parts();
        let err = run_supervised(&connector, &preview, &host)
            .await
            .unwrap_err();
        assert!(matches!(err, PreviewError::Transport(_)));
    }

    #[tokio::test]
    async fn test_timer_fires_between_frames() {
        let show = concat!(
            r#"{"action":"show","lcount":2,"html":"<div class=\"peek-mermaid-container\" data-line-begin=\"1\">"#,
            r#"<div id=\"graph-mermaid-3\" data-graph=\"mermaid\" data-graph-definition=\"graph LR; a--&gt;b\"></div></div>"}"#
        );
        let conn = Scripted {
            steps: vec![frame(show), Step::Wait(Duration::from_millis(400))].into(),
        };
        let (preview, host) = parts();

        assert_eq!(run_session(conn, &preview, &host).await, SessionEnd::Closed);
        let host = host.borrow();
        assert_eq!(host.jobs.len(), 1);
        assert_eq!(host.jobs[0].render_id, "graph-mermaid-3-svg");
        assert_eq!(host.jobs[0].definition, "graph LR; a-->b");
    }
}
