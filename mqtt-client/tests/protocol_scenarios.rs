// Copyright (c) 2020 Xu Shaohua <shaohua@biofan.org>. All rights reserved.
// Use of this source is governed by GNU Lesser General Public License that can be found
// in the LICENSE file.

//! End-to-end scenarios driving the Client Engine against a fake
//! in-memory server, asserting on the literal bytes that cross the
//! wire and on the `Update`s the engine emits.
//!
//! Every request/reply pair below is driven with `tokio::join!` rather
//! than sequential `.await`s: the `Client` method and the fake
//! server's read of what it sent are two ends of the same exchange,
//! and neither side makes progress until both are polled.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use mqtt_client::fake_channel::{FakeChannelFactory, FakeServerHandle};
use mqtt_client::{
    start_with_channel_factory, ConnectionState, PublishData, QoS, SubscribeRequest, Update,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

async fn next_server_handle(handles_rx: &mut UnboundedReceiver<FakeServerHandle>) -> FakeServerHandle {
    timeout(DEFAULT_TIMEOUT, handles_rx.recv())
        .await
        .expect("a connect attempt should mint a server handle")
        .expect("factory channel should still be open")
}

/// Drives one `connect()` call to completion against the next fake
/// server handle, replying with an accepting ConnAck.
async fn connect_accepted(
    client: &mqtt_client::Client,
    handles_rx: &mut UnboundedReceiver<FakeServerHandle>,
) -> FakeServerHandle {
    let connect_task = client.connect(DEFAULT_TIMEOUT);
    let server_task = async {
        let mut server = next_server_handle(handles_rx).await;
        let _ = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should send Connect")
            .expect("channel should still be open");
        server.push_bytes(vec![0x20, 0x02, 0x00, 0x00]);
        server
    };
    let (connect_result, server) = tokio::join!(connect_task, server_task);
    connect_result.expect("ConnAck should accept");
    server
}

#[tokio::test]
async fn s1_connect_round_trip() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let mut options = mqtt_client::ConnectOptions::new("test-client-id");
    options.set_keep_alive(Duration::from_secs(15));
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut updates = client.updates();

    let connect_task = client.connect(DEFAULT_TIMEOUT);
    let server_task = async {
        let mut server = next_server_handle(&mut handles_rx).await;
        let sent = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should send Connect")
            .expect("channel should still be open");

        let mut expected = vec![0x10];
        let variable_header: &[u8] = &[0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x0F];
        let payload: &[u8] = &[
            0x00, 0x0E, b't', b'e', b's', b't', b'-', b'c', b'l', b'i', b'e', b'n', b't', b'-',
            b'i', b'd',
        ];
        expected.push((variable_header.len() + payload.len()) as u8);
        expected.extend_from_slice(variable_header);
        expected.extend_from_slice(payload);
        assert_eq!(sent, expected);

        server.push_bytes(vec![0x20, 0x02, 0x00, 0x00]);
    };
    let (connect_result, ()) = tokio::join!(connect_task, server_task);
    let session_present = connect_result.expect("ConnAck should accept");
    assert!(!session_present);

    let update = timeout(DEFAULT_TIMEOUT, updates.next())
        .await
        .expect("an update should be emitted")
        .expect("stream should not have ended");
    assert_eq!(
        update,
        Update::ConnectionStateChanged(ConnectionState::ConnectAccepted(false))
    );
}

#[tokio::test]
async fn s2_rejected_connect_then_retry_succeeds() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let options = mqtt_client::ConnectOptions::new("retry-client");
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut updates = client.updates();

    let connect_task = client.connect(DEFAULT_TIMEOUT);
    let server_task = async {
        let mut server = next_server_handle(&mut handles_rx).await;
        let _ = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should send Connect")
            .expect("channel should still be open");
        // BadUsernameOrPassword.
        server.push_bytes(vec![0x20, 0x02, 0x00, 0x04]);
    };
    let (connect_result, ()) = tokio::join!(connect_task, server_task);
    assert_eq!(connect_result, Err(mqtt_client::ConnectError::BadUsernameOrPassword));

    let update = timeout(DEFAULT_TIMEOUT, updates.next())
        .await
        .expect("a Disconnected update should be emitted")
        .expect("stream should not have ended");
    assert_eq!(
        update,
        Update::ConnectionStateChanged(ConnectionState::Disconnected)
    );

    let retry_task = client.connect(DEFAULT_TIMEOUT);
    let retry_server_task = async {
        let mut server = next_server_handle(&mut handles_rx).await;
        let _ = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should resend Connect")
            .expect("channel should still be open");
        server.push_bytes(vec![0x20, 0x02, 0x00, 0x00]);
    };
    let (retry_result, ()) = tokio::join!(retry_task, retry_server_task);
    let session_present = retry_result.expect("second attempt should be accepted");
    assert!(!session_present);
}

#[tokio::test]
async fn s3_subscribe_success() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let options = mqtt_client::ConnectOptions::new("sub-client");
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut server = connect_accepted(&client, &mut handles_rx).await;

    let topics = vec![
        SubscribeRequest {
            filter: "topic0".into(),
            qos: QoS::AtMostOnce,
        },
        SubscribeRequest {
            filter: "topic1".into(),
            qos: QoS::AtLeastOnce,
        },
        SubscribeRequest {
            filter: "topic2".into(),
            qos: QoS::ExactlyOnce,
        },
    ];
    let subscribe_task = client.subscribe(topics, DEFAULT_TIMEOUT);
    let server_task = async {
        let sent = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should send Subscribe")
            .expect("channel should still be open");
        assert_eq!(sent[0], 0x82);
        // Skip fixed header byte and remaining-length varint (single byte here).
        let packet_id = u16::from_be_bytes([sent[2], sent[3]]);
        assert_eq!(packet_id, 1);
        let rest = &sent[4..];
        let expected_rest: &[u8] = &[
            0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'0', 0x00, 0x00, 0x06, b't', b'o', b'p',
            b'i', b'c', b'1', 0x01, 0x00, 0x06, b't', b'o', b'p', b'i', b'c', b'2', 0x02,
        ];
        assert_eq!(rest, expected_rest);

        server.push_bytes(vec![0x90, 0x05, 0x00, 0x01, 0x00, 0x01, 0x80]);
    };
    let (subscribe_result, ()) = tokio::join!(subscribe_task, server_task);

    let results = subscribe_result.expect("SubAck should resolve");
    assert_eq!(
        results,
        vec![
            mqtt_client::Subscription::Success(QoS::AtMostOnce),
            mqtt_client::Subscription::Success(QoS::AtLeastOnce),
            mqtt_client::Subscription::Failure,
        ]
    );
}

#[tokio::test]
async fn s4_publish_qos0() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let options = mqtt_client::ConnectOptions::new("pub-client");
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut server = connect_accepted(&client, &mut handles_rx).await;

    let data = PublishData::at_most_once("topic", b"payload".to_vec(), false);
    client
        .publish(data, DEFAULT_TIMEOUT)
        .await
        .expect("publish should succeed");

    let sent = timeout(DEFAULT_TIMEOUT, server.recv_sent())
        .await
        .expect("client should send Publish")
        .expect("channel should still be open");

    let mut expected = vec![0x30];
    let body: &[u8] = &[
        0x00, 0x05, b't', b'o', b'p', b'i', b'c', b'p', b'a', b'y', b'l', b'o', b'a', b'd',
    ];
    expected.push(body.len() as u8);
    expected.extend_from_slice(body);
    assert_eq!(sent, expected);

    // A QoS 0 publish carries no packet id, and the broker sends
    // nothing back for it.
    assert!(timeout(Duration::from_millis(100), server.recv_sent())
        .await
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn s5_keep_alive_ping_and_timeout() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let mut options = mqtt_client::ConnectOptions::new("ping-client");
    options.set_keep_alive(Duration::from_secs(1));
    options.set_server_timeout(Duration::from_millis(500));
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut updates = client.updates();
    let mut server = connect_accepted(&client, &mut handles_rx).await;

    let connected_update = timeout(DEFAULT_TIMEOUT, updates.next())
        .await
        .expect("a ConnectAccepted update should be emitted")
        .expect("stream should not have ended");
    assert_eq!(
        connected_update,
        Update::ConnectionStateChanged(ConnectionState::ConnectAccepted(false))
    );

    let sent = timeout(Duration::from_secs(5), server.recv_sent())
        .await
        .expect("PingReq should be sent after the keep-alive interval")
        .expect("channel should still be open");
    assert_eq!(sent, vec![0xC0, 0x00]);

    // No PingResp: the engine should disconnect after server_timeout.
    let update = timeout(Duration::from_secs(2), updates.next())
        .await
        .expect("a Disconnected update should follow the missed PingResp")
        .expect("stream should not have ended");
    assert_eq!(
        update,
        Update::ConnectionStateChanged(ConnectionState::Disconnected)
    );
}

#[tokio::test(start_paused = true)]
async fn s5_pingresp_within_deadline_reschedules_next_ping() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let mut options = mqtt_client::ConnectOptions::new("ping-client-2");
    options.set_keep_alive(Duration::from_secs(1));
    options.set_server_timeout(Duration::from_millis(500));
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut server = connect_accepted(&client, &mut handles_rx).await;

    let _ = timeout(Duration::from_secs(5), server.recv_sent())
        .await
        .expect("PingReq should be sent after the keep-alive interval")
        .expect("channel should still be open");

    server.push_bytes(vec![0xD0, 0x00]);

    let sent = timeout(Duration::from_secs(5), server.recv_sent())
        .await
        .expect("a second PingReq should follow one keep-alive interval later")
        .expect("channel should still be open");
    assert_eq!(sent, vec![0xC0, 0x00]);
}

#[tokio::test]
async fn s6_disconnect_aborts_in_flight_connect() {
    let (factory, mut handles_rx) = FakeChannelFactory::new();
    let options = mqtt_client::ConnectOptions::new("abort-client");
    let client = start_with_channel_factory(options, Arc::new(factory));
    let mut updates = client.updates();

    let connect_task = client.connect(DEFAULT_TIMEOUT);
    let driver_task = async {
        let mut server = next_server_handle(&mut handles_rx).await;
        let _ = timeout(DEFAULT_TIMEOUT, server.recv_sent())
            .await
            .expect("client should send Connect")
            .expect("channel should still be open");
        client.disconnect().await;
        server
    };
    let (connect_result, mut server) = tokio::join!(connect_task, driver_task);
    assert_eq!(connect_result, Err(mqtt_client::ConnectError::DisconnectRequested));

    let update = timeout(DEFAULT_TIMEOUT, updates.next())
        .await
        .expect("a Disconnected update should be emitted")
        .expect("stream should not have ended");
    assert_eq!(
        update,
        Update::ConnectionStateChanged(ConnectionState::Disconnected)
    );

    assert!(
        timeout(Duration::from_millis(200), server.recv_sent())
            .await
            .expect("shutdown should be observed promptly")
            .is_none(),
        "the server side should see the channel close"
    );
}
