//! End-to-end scenarios against a scripted broker.
//!
//! The broker side is a `tokio_test` mock stream: `read` queues bytes the
//! client will receive, `write` asserts the exact bytes the client must
//! send next. Frames are built with the crate's own codec so the scripts
//! stay readable. All tests run on the current-thread runtime, which makes
//! the action ordering deterministic.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use siderite_amqp::frames::{Frame, FrameCodec};
use siderite_amqp::{Connection, ConsumerMessage};
use siderite_amqp_types::methods::{basic, channel as channel_methods, connection, queue};
use siderite_amqp_types::{BasicProperties, ContentHeader, FieldTable, Method, WireDialect};
use tokio_test::io::Builder;
use tokio_util::codec::Encoder;

fn frame_bytes(frame: Frame) -> Vec<u8> {
    let mut codec = FrameCodec::new(WireDialect::Rabbit);
    let mut buf = BytesMut::new();
    codec.encode(frame, &mut buf).expect("frame encodes");
    buf.to_vec()
}

fn method_frame(channel: u16, method: Method) -> Vec<u8> {
    frame_bytes(Frame::method(channel, method))
}

fn start_frame() -> Vec<u8> {
    method_frame(
        0,
        Method::ConnectionStart(connection::Start {
            version_major: 0,
            version_minor: 9,
            server_properties: FieldTable::new(),
            mechanisms: Bytes::from_static(b"PLAIN AMQPLAIN"),
            locales: Bytes::from_static(b"en_US"),
        }),
    )
}

/// The exact `connection.start-ok` this client emits for guest/guest
fn start_ok_frame() -> Vec<u8> {
    let mut capabilities = FieldTable::new();
    capabilities.insert("publisher_confirms", true);
    capabilities.insert("consumer_cancel_notify", true);
    capabilities.insert("exchange_exchange_bindings", true);
    capabilities.insert("connection.blocked", true);
    capabilities.insert("basic.nack", true);

    let mut client_properties = FieldTable::new();
    client_properties.insert("product", "siderite-amqp");
    client_properties.insert("version", env!("CARGO_PKG_VERSION"));
    client_properties.insert("platform", "Rust");
    client_properties.insert("capabilities", capabilities);

    method_frame(
        0,
        Method::ConnectionStartOk(connection::StartOk {
            client_properties,
            mechanism: "PLAIN".into(),
            response: Bytes::from_static(b"\x00guest\x00guest"),
            locale: "en_US".into(),
        }),
    )
}

fn tune_frame(channel_max: u16, frame_max: u32, heartbeat: u16) -> Vec<u8> {
    method_frame(
        0,
        Method::ConnectionTune(connection::Tune {
            channel_max,
            frame_max,
            heartbeat,
        }),
    )
}

fn tune_ok_frame(channel_max: u16, frame_max: u32, heartbeat: u16) -> Vec<u8> {
    method_frame(
        0,
        Method::ConnectionTuneOk(connection::TuneOk {
            channel_max,
            frame_max,
            heartbeat,
        }),
    )
}

fn open_frame() -> Vec<u8> {
    method_frame(
        0,
        Method::ConnectionOpen(connection::Open {
            virtual_host: "/".into(),
        }),
    )
}

fn open_ok_frame() -> Vec<u8> {
    method_frame(0, Method::ConnectionOpenOk(connection::OpenOk::default()))
}

fn connection_close_frame(reply_code: u16, reply_text: &str) -> Vec<u8> {
    method_frame(
        0,
        Method::ConnectionClose(connection::Close {
            reply_code,
            reply_text: reply_text.into(),
            class_id: 0,
            method_id: 0,
        }),
    )
}

fn connection_close_ok_frame() -> Vec<u8> {
    method_frame(0, Method::ConnectionCloseOk(connection::CloseOk::default()))
}

fn channel_open_frame(channel: u16) -> Vec<u8> {
    method_frame(channel, Method::ChannelOpen(channel_methods::Open::default()))
}

fn channel_open_ok_frame(channel: u16) -> Vec<u8> {
    method_frame(
        channel,
        Method::ChannelOpenOk(channel_methods::OpenOk::default()),
    )
}

fn channel_close_frame(channel: u16) -> Vec<u8> {
    method_frame(
        channel,
        Method::ChannelClose(channel_methods::Close {
            reply_code: 200,
            reply_text: String::new(),
            class_id: 0,
            method_id: 0,
        }),
    )
}

fn channel_close_ok_frame(channel: u16) -> Vec<u8> {
    method_frame(
        channel,
        Method::ChannelCloseOk(channel_methods::CloseOk::default()),
    )
}

const HEARTBEAT_OCTETS: [u8; 8] = [0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xCE];

/// Queues the whole preamble/start/tune/open exchange on a builder.
///
/// The client proposes no limits of its own, so the tune-ok echoes the
/// broker's values back.
fn script_handshake(builder: &mut Builder, heartbeat: u16) {
    builder
        .write(b"AMQP\x00\x00\x09\x01")
        .read(&start_frame())
        .write(&start_ok_frame())
        .read(&tune_frame(2047, 131072, heartbeat))
        .write(&tune_ok_frame(2047, 131072, heartbeat))
        .write(&open_frame())
        .read(&open_ok_frame());
}

fn client() -> siderite_amqp::connection::builder::Builder {
    Connection::builder()
        .heartbeat(0)
        .channel_max(0)
        .frame_max(0)
}

#[tokio::test]
async fn handshake_emits_preamble_start_ok_and_tune_ok() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 60);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    // scenario: the client proposed 0/0/0, the broker 2047/131072/60
    assert_eq!(connection.channel_max(), 2047);
    assert_eq!(connection.frame_max(), 131072);
    assert_eq!(connection.heartbeat(), 60);

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[tokio::test]
async fn version_mismatch_reply_fails_the_open() {
    let mock = Builder::new()
        .write(b"AMQP\x00\x00\x09\x01")
        .read(b"AMQP\x00\x01\x00\x00")
        .build();

    match client().open_with_stream(mock).await {
        Err(siderite_amqp::connection::OpenError::VersionMismatch {
            major: 1,
            minor: 0,
            revision: 0,
        }) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn auth_refusal_maps_to_auth_failure() {
    let mock = Builder::new()
        .write(b"AMQP\x00\x00\x09\x01")
        .read(&start_frame())
        .write(&start_ok_frame())
        .read(&connection_close_frame(403, "ACCESS_REFUSED"))
        .write(&connection_close_ok_frame())
        .build();

    match client().open_with_stream(mock).await {
        Err(siderite_amqp::connection::OpenError::AuthFailure { reply_text }) => {
            assert_eq!(reply_text, "ACCESS_REFUSED");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn publish_splits_the_body_at_frame_max_minus_overhead() {
    // the client proposes 4096, which wins against the broker's 131072
    let mut builder = Builder::new();
    builder
        .write(b"AMQP\x00\x00\x09\x01")
        .read(&start_frame())
        .write(&start_ok_frame())
        .read(&tune_frame(2047, 131072, 0))
        .write(&tune_ok_frame(2047, 4096, 0))
        .write(&open_frame())
        .read(&open_ok_frame());
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = Connection::builder()
        .heartbeat(0)
        .frame_max(4096)
        .open_with_stream(mock)
        .await
        .unwrap();
    assert_eq!(connection.frame_max(), 4096);

    io.write(&channel_open_frame(1));
    io.read(&channel_open_ok_frame(1));
    let channel = connection.open_channel().await.unwrap();

    let body = vec![0x5A; 10000];
    let publish = basic::Publish {
        routing_key: "bulk".into(),
        ..Default::default()
    };
    io.write(&method_frame(1, Method::BasicPublish(publish.clone())));
    io.write(&frame_bytes(Frame::header(
        1,
        ContentHeader::basic(10000, BasicProperties::default()),
    )));
    io.write(&frame_bytes(Frame::body(1, Bytes::from(body[..4088].to_vec()))));
    io.write(&frame_bytes(Frame::body(
        1,
        Bytes::from(body[4088..8176].to_vec()),
    )));
    io.write(&frame_bytes(Frame::body(1, Bytes::from(body[8176..].to_vec()))));

    let seq = channel
        .publish(publish, BasicProperties::default(), body.clone())
        .await
        .unwrap();
    assert_eq!(seq, None);

    io.write(&channel_close_frame(1));
    io.read(&channel_close_ok_frame(1));
    let mut channel = channel;
    channel.close().await.unwrap();

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn write_silence_triggers_a_heartbeat_frame() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 10);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();
    assert_eq!(connection.heartbeat(), 10);

    // with heartbeat 10 the emission timer fires after 5 s of write
    // silence; the next wait emits the fixed eight octets
    io.write(&HEARTBEAT_OCTETS);
    tokio::time::sleep(Duration::from_secs(6)).await;

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn inbound_silence_past_twice_the_heartbeat_is_fatal() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 10);
    // queue heartbeat writes the engine will emit while the broker stays
    // silent: at 5, 10, 15 and 20 seconds
    builder
        .write(&HEARTBEAT_OCTETS)
        .write(&HEARTBEAT_OCTETS)
        .write(&HEARTBEAT_OCTETS)
        .write(&HEARTBEAT_OCTETS);
    let (mock, _io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    // the miss deadline is 2 * 10 + 1 seconds of broker silence
    let outcome = connection.on_close().await;
    match outcome {
        Err(siderite_amqp::connection::Error::Transport(
            siderite_amqp::transport::Error::HeartbeatMissed,
        )) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn channel_close_with_not_found_is_scoped_to_the_channel() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    io.write(&channel_open_frame(1));
    io.read(&channel_open_ok_frame(1));
    let channel = connection.open_channel().await.unwrap();

    let declare = queue::Declare {
        queue: "missing".into(),
        passive: true,
        ..Default::default()
    };
    io.write(&method_frame(1, Method::QueueDeclare(declare.clone())));
    io.read(&method_frame(
        1,
        Method::ChannelClose(channel_methods::Close {
            reply_code: 404,
            reply_text: "NOT_FOUND - no queue 'missing' in vhost '/'".into(),
            class_id: 50,
            method_id: 10,
        }),
    ));
    io.write(&method_frame(
        1,
        Method::ChannelCloseOk(channel_methods::CloseOk::default()),
    ));

    match channel.queue_declare(declare).await {
        Err(siderite_amqp::channel::Error::Closed {
            reply_code: 404,
            class_id: 50,
            method_id: 10,
            ..
        }) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }

    // the connection survives the channel error
    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    drop(channel);
    connection.close().await.unwrap();
}

#[tokio::test]
async fn deliveries_are_assembled_and_routed_to_their_consumer() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    io.write(&channel_open_frame(1));
    io.read(&channel_open_ok_frame(1));
    let channel = connection.open_channel().await.unwrap();

    let consume = basic::Consume {
        queue: "work".into(),
        ..Default::default()
    };
    io.write(&method_frame(1, Method::BasicConsume(consume.clone())));
    io.read(&method_frame(
        1,
        Method::BasicConsumeOk(basic::ConsumeOk {
            consumer_tag: "ctag-1".into(),
        }),
    ));
    let (tag, mut deliveries) = channel.consume(consume).await.unwrap();
    assert_eq!(tag, "ctag-1");

    // deliver a message whose body spans two frames
    let mut script = method_frame(
        1,
        Method::BasicDeliver(basic::Deliver {
            consumer_tag: "ctag-1".into(),
            delivery_tag: 1,
            redelivered: false,
            exchange: String::new(),
            routing_key: "work".into(),
        }),
    );
    script.extend(frame_bytes(Frame::header(
        1,
        ContentHeader::basic(
            10,
            BasicProperties {
                delivery_mode: Some(2),
                ..Default::default()
            },
        ),
    )));
    script.extend(frame_bytes(Frame::body(1, Bytes::from_static(b"hello "))));
    script.extend(frame_bytes(Frame::body(1, Bytes::from_static(b"amqp"))));
    io.read(&script);

    match deliveries.recv().await {
        Some(ConsumerMessage::Delivery(delivery)) => {
            assert_eq!(delivery.delivery_tag, 1);
            assert_eq!(delivery.routing_key, "work");
            assert_eq!(delivery.properties.delivery_mode, Some(2));
            assert_eq!(&delivery.body[..], b"hello amqp");
        }
        other => panic!("unexpected consumer item: {other:?}"),
    }

    io.write(&method_frame(
        1,
        Method::BasicAck(basic::Ack {
            delivery_tag: 1,
            multiple: false,
        }),
    ));
    channel
        .ack(basic::Ack {
            delivery_tag: 1,
            multiple: false,
        })
        .await
        .unwrap();

    // acknowledging the same tag again is a client error, nothing is sent
    match channel
        .ack(basic::Ack {
            delivery_tag: 1,
            multiple: false,
        })
        .await
    {
        Err(siderite_amqp::channel::Error::UnknownDeliveryTag(1)) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }

    io.write(&channel_close_frame(1));
    io.read(&channel_close_ok_frame(1));
    let mut channel = channel;
    channel.close().await.unwrap();

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[tokio::test]
async fn publisher_confirms_settle_through_the_confirm_stream() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    io.write(&channel_open_frame(1));
    io.read(&channel_open_ok_frame(1));
    let mut channel = connection.open_channel().await.unwrap();

    io.write(&method_frame(
        1,
        Method::ConfirmSelect(siderite_amqp_types::methods::confirm::Select {
            nowait: false,
        }),
    ));
    io.read(&method_frame(
        1,
        Method::ConfirmSelectOk(siderite_amqp_types::methods::confirm::SelectOk::default()),
    ));
    channel.confirm_select().await.unwrap();

    let publish = basic::Publish {
        routing_key: "confirmed".into(),
        ..Default::default()
    };
    io.write(&method_frame(1, Method::BasicPublish(publish.clone())));
    io.write(&frame_bytes(Frame::header(
        1,
        ContentHeader::basic(2, BasicProperties::default()),
    )));
    io.write(&frame_bytes(Frame::body(1, Bytes::from_static(b"ok"))));

    let seq = channel
        .publish(publish, BasicProperties::default(), &b"ok"[..])
        .await
        .unwrap();
    assert_eq!(seq, Some(1));
    assert_eq!(channel.unconfirmed_count(), 1);

    io.read(&method_frame(
        1,
        Method::BasicAck(basic::Ack {
            delivery_tag: 1,
            multiple: false,
        }),
    ));
    let confirm = channel.next_confirm().await.unwrap();
    assert!(confirm.ack);
    assert_eq!(confirm.delivery_tag, 1);
    assert_eq!(channel.unconfirmed_count(), 0);

    io.write(&channel_close_frame(1));
    io.read(&channel_close_ok_frame(1));
    channel.close().await.unwrap();

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[tokio::test]
async fn unknown_method_on_channel_zero_closes_with_frame_error() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    // a well-formed method frame with an unknown (class, method) pair
    let mut unknown = Vec::new();
    unknown.extend_from_slice(&[0x01, 0x00, 0x00]); // type 1, channel 0
    unknown.extend_from_slice(&4u32.to_be_bytes());
    unknown.extend_from_slice(&10u16.to_be_bytes());
    unknown.extend_from_slice(&255u16.to_be_bytes());
    unknown.push(0xCE);
    io.read(&unknown);
    io.write(&connection_close_frame(501, "unknown method on channel 0"));
    io.read(&connection_close_ok_frame());

    match connection.on_close().await {
        Err(siderite_amqp::connection::Error::ProtocolViolation {
            reply_code: 501,
            ..
        }) => {}
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn blocked_notifications_surface_as_events() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = client().open_with_stream(mock).await.unwrap();

    io.read(&method_frame(
        0,
        Method::ConnectionBlocked(connection::Blocked {
            reason: "low on memory".into(),
        }),
    ));
    match connection.next_event().await {
        Some(siderite_amqp::ConnectionEvent::Blocked { reason }) => {
            assert_eq!(reason, "low on memory");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    io.read(&method_frame(
        0,
        Method::ConnectionUnblocked(connection::Unblocked::default()),
    ));
    match connection.next_event().await {
        Some(siderite_amqp::ConnectionEvent::Unblocked) => {}
        other => panic!("unexpected event: {other:?}"),
    }

    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn a_signal_observed_during_a_wait_is_dispatched_as_an_event() {
    let mut builder = Builder::new();
    script_handshake(&mut builder, 0);
    let (mock, mut io) = builder.build_with_handle();

    let mut connection = Connection::builder()
        .heartbeat(0)
        .dispatch_signals(true)
        .open_with_stream(mock)
        .await
        .unwrap();

    // deliver SIGINT to ourselves; tokio's handler observes it and the
    // engine surfaces it at the next safe point without leaving the wait
    let status = std::process::Command::new("kill")
        .args(["-INT", &std::process::id().to_string()])
        .status()
        .expect("kill is available");
    assert!(status.success());

    let event = tokio::time::timeout(Duration::from_secs(5), connection.next_event())
        .await
        .expect("signal dispatched in time");
    match event {
        Some(siderite_amqp::ConnectionEvent::Interrupted(siderite_amqp::Signal::Interrupt)) => {}
        other => panic!("unexpected event: {other:?}"),
    }

    // the wait was re-entered transparently: the connection still works
    io.write(&connection_close_frame(200, ""));
    io.read(&connection_close_ok_frame());
    connection.close().await.unwrap();
}
