//! Bridge snapshot, command forwarding and update relay

#[cfg(test)]
mod tests {
    use crate::common::{app_state, gateway_config};
    use serde_json::{Value, json};
    use std::time::Duration;
    use telegate::config::BridgeConfig;
    use telegate::core::broadcast::ServerMessage;
    use tokio::sync::mpsc::Receiver;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn next_frame(rx: &mut Receiver<String>) -> Value {
        let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("frame in time")
            .expect("open queue");
        serde_json::from_str(&frame).unwrap()
    }

    fn bridge_config(url: String) -> BridgeConfig {
        BridgeConfig {
            enabled: true,
            url,
            ..BridgeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_snapshot_then_relayed_updates() {
        let bridge = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshot"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"channels": ["@news", "@memes"]})),
            )
            .mount(&bridge)
            .await;

        let mut gateway = gateway_config();
        gateway.bridge = bridge_config(bridge.uri());
        let state = app_state(gateway).await;
        let handles = state.start_background().await.unwrap();

        let (_first, mut first_rx) = state.broadcaster.connect("bot");
        let (_second, mut second_rx) = state.broadcaster.connect("admin");
        assert_eq!(state.broadcaster.client_count(), 2);

        for rx in [&mut first_rx, &mut second_rx] {
            assert_eq!(next_frame(rx).await["type"], "connected");
            let snapshot = next_frame(rx).await;
            assert_eq!(snapshot["type"], "snapshot");
            assert_eq!(snapshot["data"]["channels"][0], "@news");
        }

        let receivers = state
            .storage
            .store()
            .publish("tdlib:updates", r#"{"chatId": 42, "text": "hi"}"#)
            .await
            .unwrap();
        assert_eq!(receivers, 1);

        for rx in [&mut first_rx, &mut second_rx] {
            let update = next_frame(rx).await;
            assert_eq!(update["type"], "update");
            assert_eq!(update["data"]["chatId"], 42);
        }
        assert_eq!(state.broadcaster.stats().messages_broadcast, 1);

        state.shutdown();
        for handle in handles {
            handle.abort();
        }
    }

    #[tokio::test]
    async fn test_commands_are_forwarded_with_request_id() {
        let bridge = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/commands"))
            .and(body_json(json!({"command": "join", "params": {"channel": "@news"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"joined": true})))
            .expect(1)
            .mount(&bridge)
            .await;

        let mut gateway = gateway_config();
        gateway.bridge = bridge_config(bridge.uri());
        let state = app_state(gateway).await;

        let join = concat!(
            r#"{"type": "command", "requestId": "r-1", "#,
            r#""command": "join", "params": {"channel": "@news"}}"#
        );
        let reply = state.broadcaster.handle_client_message(join).await;
        match reply {
            ServerMessage::CommandResult {
                request_id,
                success,
                data,
                ..
            } => {
                assert_eq!(request_id, "r-1");
                assert!(success);
                assert_eq!(data, Some(json!({"joined": true})));
            }
            other => panic!("unexpected reply {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disabled_bridge_still_serves_snapshot() {
        let state = app_state(gateway_config()).await;
        assert_eq!(state.broadcaster.bridge().name(), "disabled");

        let (_id, mut rx) = state.broadcaster.connect("bot");
        assert_eq!(next_frame(&mut rx).await["type"], "connected");
        let snapshot = next_frame(&mut rx).await;
        assert_eq!(snapshot["data"]["bridge"], "disabled");
    }
}
