use std::sync::Arc;
use std::thread;

use synthex_codec::{encode_program_dump, CodecConfig, DecodedMessage, ParameterId, Program};
use synthex_frame::ChecksumMode;
use synthex_hub::{ConnectionCoordinator, Event, EventKind};
use synthex_transport::DeviceId;

fn device(id: u8) -> DeviceId {
    DeviceId::new(id).expect("device id should be valid")
}

fn program(cutoff: u8) -> Program {
    Program::new()
        .with(ParameterId::Cutoff, cutoff)
        .expect("cutoff should be in range")
}

fn program_number(event: Event) -> u8 {
    match event {
        Event::Message(message) => match &*message {
            DecodedMessage::ProgramDump { program_number, .. } => *program_number,
            other => panic!("unexpected message {other:?}"),
        },
        other => panic!("unexpected event {other:?}"),
    }
}

#[test]
fn frames_arrive_in_order_regardless_of_chunking() {
    let coordinator = ConnectionCoordinator::new();
    let id = device(0);
    let config = CodecConfig::new(id).with_checksum_mode(ChecksumMode::Complement7);
    coordinator.connect(config);
    let sub = coordinator.subscribe(id, EventKind::Message);

    let mut wire = Vec::new();
    for n in 0..10u8 {
        wire.push(0xF8);
        wire.extend_from_slice(&encode_program_dump(&program(n * 10), n, &config).unwrap());
    }
    for chunk in wire.chunks(7) {
        coordinator.push_bytes(id, chunk);
    }

    let numbers: Vec<u8> = (0..10).map(|_| program_number(sub.recv().unwrap())).collect();
    assert_eq!(numbers, (0..10).collect::<Vec<u8>>());
}

#[test]
fn every_subscriber_sees_the_same_sequence() {
    let coordinator = ConnectionCoordinator::new();
    let id = device(1);
    let config = CodecConfig::new(id);
    let subs: Vec<_> = (0..3)
        .map(|_| coordinator.subscribe(id, EventKind::Message))
        .collect();

    for n in 0..5u8 {
        let bytes = encode_program_dump(&Program::new(), n, &config).unwrap();
        coordinator.push_bytes(id, &bytes);
    }

    for sub in &subs {
        let got: Vec<u8> = (0..5).map(|_| program_number(sub.recv().unwrap())).collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }
}

#[test]
fn devices_are_independent() {
    let coordinator = Arc::new(ConnectionCoordinator::new());
    let a = coordinator.subscribe(device(1), EventKind::Raw);
    let b = coordinator.subscribe(device(2), EventKind::Raw);

    // A half frame on one device must not bleed into the other.
    coordinator.push_bytes(device(1), &[0xF0, 0x11]);
    coordinator.push_bytes(device(2), &[0xF0, 0x22, 0xF7]);
    coordinator.push_bytes(device(1), &[0xF7]);

    assert_eq!(a.try_recv().map(raw_bytes), Some(vec![0xF0, 0x11, 0xF7]));
    assert_eq!(b.try_recv().map(raw_bytes), Some(vec![0xF0, 0x22, 0xF7]));
}

#[test]
fn concurrent_producers_on_different_devices() {
    let coordinator = Arc::new(ConnectionCoordinator::new());
    let subs: Vec<_> = (0..4)
        .map(|id| coordinator.subscribe(device(id), EventKind::Raw))
        .collect();

    let producers: Vec<_> = (0..4u8)
        .map(|id| {
            let coordinator = Arc::clone(&coordinator);
            thread::spawn(move || {
                for n in 0..20u8 {
                    coordinator.push_bytes(device(id), &[0xF0, id, n]);
                    coordinator.push_bytes(device(id), &[0xF7]);
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().expect("producer should finish");
    }

    for (id, sub) in subs.iter().enumerate() {
        for n in 0..20u8 {
            assert_eq!(
                sub.try_recv().map(raw_bytes),
                Some(vec![0xF0, id as u8, n, 0xF7])
            );
        }
    }
}

#[test]
fn consumer_blocks_until_producer_delivers() {
    let coordinator = Arc::new(ConnectionCoordinator::new());
    let id = device(3);
    let sub = coordinator.subscribe(id, EventKind::Raw);

    let consumer = thread::spawn(move || sub.recv().map(raw_bytes));
    thread::sleep(std::time::Duration::from_millis(20));
    coordinator.push_bytes(id, &[0xF0, 0x01, 0xF7]);

    assert_eq!(
        consumer.join().expect("consumer should finish"),
        Some(vec![0xF0, 0x01, 0xF7])
    );
}

#[test]
fn slow_consumer_does_not_block_producer() {
    let coordinator = ConnectionCoordinator::new();
    let id = device(4);
    let sub = coordinator.subscribe(id, EventKind::Raw);

    for n in 0..100u8 {
        coordinator.push_bytes(id, &[0xF0, n % 0x80, 0xF7]);
    }
    // Default raw queue keeps the first 32 frames and sheds the rest.
    assert_eq!(sub.pending(), 32);
    assert_eq!(sub.dropped(), 68);
    assert_eq!(sub.try_recv().map(raw_bytes), Some(vec![0xF0, 0, 0xF7]));
}

#[cfg(feature = "async")]
#[tokio::test]
async fn recv_async_wakes_on_delivery() {
    let coordinator = Arc::new(ConnectionCoordinator::new());
    let id = device(6);
    let sub = coordinator.subscribe(id, EventKind::Raw);

    let producer = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            coordinator.push_bytes(id, &[0xF0, 0x05, 0xF7]);
            coordinator.disconnect(id);
        })
    };

    assert_eq!(sub.recv_async().await.map(raw_bytes), Some(vec![0xF0, 0x05, 0xF7]));
    assert!(sub.recv_async().await.is_none());
    producer.await.expect("producer task should finish");
}

fn raw_bytes(event: Event) -> Vec<u8> {
    match event {
        Event::Raw(frame) => frame.as_bytes().to_vec(),
        other => panic!("unexpected event {other:?}"),
    }
}
