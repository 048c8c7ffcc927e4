//! Wire a coordinator to an in-memory output and feed its own traffic back.
//!
//! Run with: `cargo run -p synthex --example loopback`

use std::sync::Arc;
use std::thread;

use synthex::codec::{CodecConfig, ParameterId, Program};
use synthex::hub::{ConnectionCoordinator, Event, EventKind};
use synthex::transport::{DeviceId, MemoryOutput};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device = DeviceId::new(3)?;
    let output = Arc::new(MemoryOutput::new());
    let coordinator = Arc::new(ConnectionCoordinator::new().with_output(output.clone()));
    coordinator.connect(CodecConfig::new(device));

    let messages = coordinator.subscribe(device, EventKind::Message);
    let changes = coordinator.subscribe(device, EventKind::ParameterChange);

    let program = Program::new()
        .with(ParameterId::Cutoff, 40)?
        .with(ParameterId::LfoShape, 2)?;
    coordinator.send_program_dump(device, &program, 7)?;
    coordinator.send_parameter_change(device, 0, ParameterId::Resonance, 99)?;

    // Replay everything that went out, three bytes at a time.
    let wire: Vec<u8> = output
        .sent_to(device)
        .iter()
        .flat_map(|bytes| bytes.iter().copied())
        .collect();
    let producer = {
        let coordinator = Arc::clone(&coordinator);
        thread::spawn(move || {
            for chunk in wire.chunks(3) {
                coordinator.push_bytes(device, chunk);
            }
            coordinator.disconnect(device);
        })
    };

    for event in messages {
        if let Event::Message(message) = event {
            println!("message: {:?}", message.command());
        }
    }
    for event in changes {
        if let Event::ParameterChange(change) = event {
            println!(
                "parameter change: ch={} {} = {}",
                change.channel, change.parameter, change.value
            );
        }
    }

    producer
        .join()
        .map_err(|_| "producer thread panicked")?;
    Ok(())
}
