//! # Peer Flows
//!
//! The server remembers the last trusted sender so application code can push
//! unsolicited messages to it. Replies always go to the window they came
//! from, even when a newer peer has been recorded since.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use frame_rpc::{async_handler, ChannelWindow, HandlerError};
    use serde_json::{json, Value};

    use crate::integration::harness::*;

    const SECOND_ORIGIN: &str = "https://notebook.example";

    #[tokio::test]
    async fn test_no_peer_before_contact() {
        let harness = Harness::start(&[HOST_ORIGIN], |_| {});
        assert!(harness.server.peer().is_none());
    }

    #[tokio::test]
    async fn test_push_to_last_peer() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server.register_fn("hello", |_| Ok(json!("hi"))).unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness.send(&window, request(1, "hello", vec![])).await;
        assert_eq!(recv(&mut inbox).await["result"], "hi");

        let peer = harness.server.peer().unwrap();
        assert_eq!(peer.origin, HOST_ORIGIN);
        peer.post(json!({"navigate": "/annotations/42"})).unwrap();
        assert_eq!(
            recv(&mut inbox).await,
            json!({"navigate": "/annotations/42"})
        );
    }

    #[tokio::test]
    async fn test_untrusted_sender_never_becomes_peer() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server.register_fn("hello", |_| Ok(json!("hi"))).unwrap();
        });
        let (trusted, mut trusted_inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);
        let (intruder, mut intruder_inbox) = ChannelWindow::new("intruder", EVIL_ORIGIN);

        harness.send(&trusted, request(1, "hello", vec![])).await;
        recv(&mut trusted_inbox).await;
        harness.send(&intruder, request(2, "hello", vec![])).await;
        assert_silent(&mut intruder_inbox).await;

        let peer = harness.server.peer().unwrap();
        assert_eq!(peer.origin, HOST_ORIGIN);
        assert_eq!(peer.window.label(), "sidebar");
    }

    #[tokio::test]
    async fn test_wait_for_peer_resolves_on_first_contact() {
        let harness = Harness::start(&[HOST_ORIGIN], |_| {});
        let server = harness.server.clone();
        let waiter = tokio::spawn(async move { server.wait_for_peer().await });

        tokio::time::sleep(QUIET_PERIOD).await;
        assert!(!waiter.is_finished());

        let (window, _inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);
        harness
            .send(&window, request(1, "notRegistered", vec![]))
            .await;

        let peer = tokio::time::timeout(RECV_TIMEOUT, waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(peer.origin, HOST_ORIGIN);
    }

    #[tokio::test]
    async fn test_reply_goes_to_sender_captured_at_receipt() {
        let harness = Harness::start(&[HOST_ORIGIN, SECOND_ORIGIN], |server| {
            server
                .register(
                    "slow",
                    async_handler(|_params: Vec<Value>| async {
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        Ok::<_, HandlerError>(json!("slow done"))
                    }),
                )
                .unwrap();
            server
                .register_fn("fast", |_| Ok(json!("fast done")))
                .unwrap();
        });
        let (first, mut first_inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);
        let (second, mut second_inbox) = ChannelWindow::new("notebook", SECOND_ORIGIN);

        harness.send(&first, request("s", "slow", vec![])).await;
        harness.send(&second, request("f", "fast", vec![])).await;

        let fast = recv(&mut second_inbox).await;
        assert_eq!(fast["id"], "f");
        assert_eq!(harness.server.peer().unwrap().origin, SECOND_ORIGIN);

        let slow = recv(&mut first_inbox).await;
        assert_eq!(slow["id"], "s");
        assert_eq!(slow["result"], "slow done");

        assert_silent(&mut first_inbox).await;
        assert_silent(&mut second_inbox).await;
    }

    #[tokio::test]
    async fn test_closed_window_does_not_stall_server() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server.register_fn("hello", |_| Ok(json!("hi"))).unwrap();
        });
        let (gone, gone_inbox) = ChannelWindow::new("closed", HOST_ORIGIN);
        drop(gone_inbox);

        harness.send(&gone, request(1, "hello", vec![])).await;

        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);
        harness.send(&window, request(2, "hello", vec![])).await;
        assert_eq!(recv(&mut inbox).await["id"], 2);

        tokio::time::sleep(QUIET_PERIOD).await;
        assert_eq!(harness.server.metrics().delivery_failures, 1);
    }
}
