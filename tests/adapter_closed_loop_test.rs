//! Remote clients drive whole episodes over TCP against a real board, reconnecting
//! between episodes.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};

use gem_fusion::adapter::protocol::{create_hello, CommandMode};
use gem_fusion::adapter::runtime::{handle_inbound, InboundPayload, ObservationStream};
use gem_fusion::adapter::server::{run_server, AdapterStatus, ServerConfig};
use gem_fusion::adapter::{InboundCommand, OutboundMessage};
use gem_fusion::core::BoardState;

async fn read_json(
    lines: &mut tokio::io::Lines<BufReader<tokio::net::tcp::OwnedReadHalf>>,
) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(2), lines.next_line())
        .await
        .expect("timeout waiting for line")
        .expect("io error")
        .expect("expected line");
    serde_json::from_str(&line).unwrap()
}

async fn engine_loop(
    mut cmd_rx: mpsc::Receiver<InboundCommand>,
    out_tx: mpsc::UnboundedSender<OutboundMessage>,
) {
    let mut state = BoardState::new(7);
    let mut stream = ObservationStream::new();

    while let Some(inbound) = cmd_rx.recv().await {
        let reply = handle_inbound(&mut state, &inbound, &mut stream);
        let _ = out_tx.send(reply);

        if matches!(inbound.payload, InboundPayload::Command(_)) {
            // Run the turn to rest so every reply is followed by an idle board.
            state.settle();
            for ev in state.take_events() {
                stream.record_event(ev);
            }
            let _ = out_tx.send(OutboundMessage::ToClientObservation {
                client_id: inbound.client_id,
                obs: stream.observe(&state),
            });
        }
    }
}

#[tokio::test]
async fn closed_loop_episodes_with_reconnects() {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        max_pending_commands: 64,
        ..ServerConfig::default()
    };

    let (cmd_tx, cmd_rx) = mpsc::channel::<InboundCommand>(128);
    let (out_tx, out_rx) = mpsc::unbounded_channel::<OutboundMessage>();
    let (ready_tx, ready_rx) = oneshot::channel();
    let (status_tx, mut status_rx) = watch::channel(AdapterStatus::default());

    let server_handle = tokio::spawn(async move {
        let _ = run_server(config, cmd_tx, out_rx, Some(ready_tx), Some(status_tx)).await;
    });
    let engine_handle = tokio::spawn(engine_loop(cmd_rx, out_tx));

    let addr = tokio::time::timeout(Duration::from_secs(2), ready_rx)
        .await
        .unwrap()
        .unwrap();

    let mut last_episode = 0u64;
    for _run in 0..3 {
        for _episode in 0..4 {
            // The previous client must be gone, otherwise the newcomer only observes.
            tokio::time::timeout(
                Duration::from_secs(2),
                status_rx.wait_for(|s| s.client_count == 0),
            )
            .await
            .expect("timeout waiting for disconnect")
            .expect("status channel closed");

            let stream = TcpStream::connect(addr).await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut lines = BufReader::new(read_half).lines();

            let mut seq: u64 = 1;
            let mut hello = create_hello(seq, "closed-loop", "2.0.0");
            hello.requested.command_mode = CommandMode::Action;
            let line = serde_json::to_string(&hello).unwrap();
            write_half.write_all(line.as_bytes()).await.unwrap();
            write_half.write_all(b"\n").await.unwrap();
            write_half.flush().await.unwrap();

            let welcome = read_json(&mut lines).await;
            assert_eq!(welcome["type"], "welcome");
            assert_eq!(welcome["role"], "controller");

            let first = read_json(&mut lines).await;
            assert_eq!(first["type"], "observation");

            seq += 1;
            let restart = serde_json::json!({
                "type": "command",
                "seq": seq,
                "ts": 1,
                "mode": "action",
                "actions": ["restart"]
            });
            write_half
                .write_all(serde_json::to_string(&restart).unwrap().as_bytes())
                .await
                .unwrap();
            write_half.write_all(b"\n").await.unwrap();
            write_half.flush().await.unwrap();

            let ack = read_json(&mut lines).await;
            assert_eq!(ack["type"], "ack");
            let mut obs = read_json(&mut lines).await;
            assert_eq!(obs["type"], "observation");
            assert_eq!(obs["moves_left"], 30);
            assert_eq!(obs["score"], 0);
            let episode = obs["episode_id"].as_u64().unwrap();
            assert!(episode > last_episode);
            last_episode = episode;

            let mut turns = 0u32;
            while obs["game_over"] != true && turns < 40 {
                seq += 1;
                let cmd = serde_json::json!({
                    "type": "command",
                    "seq": seq,
                    "ts": 1,
                    "mode": "action",
                    "actions": ["playHint"]
                });
                write_half
                    .write_all(serde_json::to_string(&cmd).unwrap().as_bytes())
                    .await
                    .unwrap();
                write_half.write_all(b"\n").await.unwrap();
                write_half.flush().await.unwrap();

                let reply = read_json(&mut lines).await;
                assert_eq!(reply["seq"], seq);
                obs = read_json(&mut lines).await;
                assert_eq!(obs["type"], "observation");
                assert!(obs["phase"] == "idle" || obs["phase"] == "game_over");

                if reply["type"] == "error" {
                    // A board without a legal swap cannot be hinted.
                    assert_eq!(reply["code"], "invalid_swap");
                    break;
                }
                assert_eq!(reply["type"], "ack");
                turns += 1;
            }

            if obs["game_over"] == true {
                assert_eq!(obs["moves_left"], 0);
                assert_eq!(turns, 30);
                assert!(obs["score"].as_u64().unwrap() > 0);
            }

            drop(write_half);
            drop(lines);
        }
    }

    server_handle.abort();
    engine_handle.abort();
}
