//! # Dispatch Flows
//!
//! Request/response through `listen()`: id echo, the origin gate,
//! method-not-found, sanitized handler failures, concurrent out-of-order
//! completion.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use frame_rpc::{async_handler, ChannelWindow, HandlerError, RequestId};
    use proptest::prelude::*;
    use serde_json::{json, Value};

    use crate::integration::harness::*;

    fn config_server() -> Harness {
        Harness::start(&[HOST_ORIGIN], |server| {
            server
                .register_fn("requestConfig", |_| Ok(json!({"theme": "light"})))
                .unwrap();
        })
    }

    // =========================================================================
    // ORIGIN GATE
    // =========================================================================

    #[tokio::test]
    async fn test_trusted_request_config() {
        let harness = config_server();
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness
            .send(&window, request("7", "requestConfig", vec![]))
            .await;

        assert_eq!(
            recv(&mut inbox).await,
            json!({"protocolVersion": "1.0", "id": "7", "result": {"theme": "light"}})
        );
        assert_silent(&mut inbox).await;
    }

    #[tokio::test]
    async fn test_untrusted_origin_gets_nothing() {
        let harness = config_server();
        let (window, mut inbox) = ChannelWindow::new("intruder", EVIL_ORIGIN);

        harness
            .send(&window, request("7", "requestConfig", vec![]))
            .await;
        harness
            .send(&window, request("8", "doesNotExist", vec![]))
            .await;
        harness.send(&window, json!({"garbage": true})).await;

        assert_silent(&mut inbox).await;
        assert_eq!(window.delivered(), 0);
        assert!(harness.server.peer().is_none());
        assert_eq!(harness.server.metrics().answered(), 0);
    }

    #[tokio::test]
    async fn test_empty_allowlist_rejects_everything() {
        let harness = Harness::start(&[], |server| {
            server
                .register_fn("requestConfig", |_| Ok(json!({})))
                .unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness
            .send(&window, request(1, "requestConfig", vec![]))
            .await;

        assert_silent(&mut inbox).await;
        assert_eq!(harness.server.metrics().dropped_untrusted, 1);
    }

    #[tokio::test]
    async fn test_origin_match_is_exact() {
        let harness = config_server();
        for origin in [
            "https://host.example:443",
            "https://HOST.example",
            "http://host.example",
            "https://sub.host.example",
        ] {
            let (window, mut inbox) = ChannelWindow::new("lookalike", origin);
            harness
                .send(&window, request(1, "requestConfig", vec![]))
                .await;
            assert_silent(&mut inbox).await;
        }
    }

    // =========================================================================
    // MALFORMED INPUT
    // =========================================================================

    #[tokio::test]
    async fn test_malformed_envelopes_dropped() {
        let harness = config_server();
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        let malformed = [
            json!("just a string"),
            json!({"protocolVersion": "1.0", "method": "requestConfig", "params": []}),
            json!({"protocolVersion": "1.0", "id": 1, "params": []}),
            json!({"protocolVersion": "2.0", "id": 1, "method": "requestConfig", "params": []}),
            json!({"id": 1, "method": "requestConfig", "params": []}),
            json!({"protocolVersion": "1.0", "id": 1, "method": "requestConfig", "params": {"a": 1}}),
            json!({"protocolVersion": "1.0", "id": "", "method": "requestConfig", "params": []}),
            json!({"protocolVersion": "1.0", "id": null, "method": "requestConfig", "params": []}),
        ];
        for data in malformed.iter().cloned() {
            harness.send(&window, data).await;
        }

        assert_silent(&mut inbox).await;
        assert_eq!(
            harness.server.metrics().dropped_malformed,
            malformed.len() as u64
        );

        // Listener still serving
        harness
            .send(&window, request(9, "requestConfig", vec![]))
            .await;
        assert_eq!(recv(&mut inbox).await["id"], 9);
    }

    // =========================================================================
    // ERRORS
    // =========================================================================

    #[tokio::test]
    async fn test_method_not_found() {
        let harness = config_server();
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness
            .send(&window, request("x-1", "doesNotExist", vec![]))
            .await;

        assert_eq!(
            recv(&mut inbox).await,
            json!({
                "protocolVersion": "1.0",
                "id": "x-1",
                "error": {"code": -32601, "message": "Method not found: doesNotExist"}
            })
        );
    }

    #[tokio::test]
    async fn test_handler_failures_are_sanitized() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server
                .register_fn("leaky", |_| {
                    Err(HandlerError::internal("db password is hunter2"))
                })
                .unwrap();
            server
                .register_fn("picky", |_| Err(HandlerError::invalid_params("needs 3 args")))
                .unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness.send(&window, request(1, "leaky", vec![])).await;
        let response = recv(&mut inbox).await;
        assert_eq!(
            response["error"],
            json!({"code": -32603, "message": "Internal error"})
        );
        assert!(!response.to_string().contains("hunter2"));
        assert!(response.get("result").is_none());

        harness.send(&window, request(2, "picky", vec![])).await;
        assert_eq!(
            recv(&mut inbox).await["error"],
            json!({"code": -32602, "message": "Invalid params"})
        );
    }

    #[tokio::test]
    async fn test_panicking_handler_does_not_stop_listener() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server
                .register_fn("boom", |_| panic!("secret panic detail"))
                .unwrap();
            server.register_fn("ok", |_| Ok(json!("fine"))).unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness.send(&window, request(1, "boom", vec![])).await;
        let response = recv(&mut inbox).await;
        assert_eq!(response["error"]["code"], -32603);
        assert!(!response.to_string().contains("secret"));

        harness.send(&window, request(2, "ok", vec![])).await;
        assert_eq!(recv(&mut inbox).await["result"], "fine");
        assert!(!harness.listener.is_finished());
    }

    // =========================================================================
    // CONCURRENCY
    // =========================================================================

    #[tokio::test]
    async fn test_responses_complete_out_of_order() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server
                .register(
                    "sleep",
                    async_handler(|params: Vec<Value>| async move {
                        let ms = params.first().and_then(Value::as_u64).unwrap_or(0);
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        Ok::<_, HandlerError>(json!(ms))
                    }),
                )
                .unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness
            .send(&window, request("slow", "sleep", vec![json!(200)]))
            .await;
        harness
            .send(&window, request("fast", "sleep", vec![json!(0)]))
            .await;

        let responses = recv_n(&mut inbox, 2).await;
        assert_eq!(responses[0]["id"], "fast");
        assert_eq!(responses[0]["result"], 0);
        assert_eq!(responses[1]["id"], "slow");
        assert_eq!(responses[1]["result"], 200);
    }

    #[tokio::test]
    async fn test_params_reach_handler_in_order() {
        let harness = Harness::start(&[HOST_ORIGIN], |server| {
            server
                .register_fn("echo", |params| Ok(Value::Array(params)))
                .unwrap();
        });
        let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);

        harness
            .send(
                &window,
                request(1, "echo", vec![json!("a"), json!({"b": 2}), json!(null)]),
            )
            .await;
        assert_eq!(
            recv(&mut inbox).await["result"],
            json!(["a", {"b": 2}, null])
        );
    }

    // =========================================================================
    // PROPERTIES
    // =========================================================================

    fn run_echo(id: RequestId) -> Value {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async move {
            let harness = config_server();
            let (window, mut inbox) = ChannelWindow::new("sidebar", HOST_ORIGIN);
            harness
                .send(&window, request(id, "requestConfig", vec![]))
                .await;
            recv(&mut inbox).await
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_string_id_echoed(id in "[a-zA-Z0-9_-]{1,64}") {
            let response = run_echo(id.clone().into());
            prop_assert_eq!(&response["id"], &json!(id));
            prop_assert!(response.get("result").is_some());
        }

        #[test]
        fn prop_numeric_id_echoed(id in any::<i64>()) {
            let response = run_echo(id.into());
            prop_assert_eq!(&response["id"], &json!(id));
        }
    }
}
