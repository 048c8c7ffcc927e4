use std::fs::File;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use synthex_codec::CodecConfig;
use synthex_hub::{
    Backpressure, ConnectionCoordinator, Event, EventKind, QueueConfig, Subscription,
};
use synthex_transport::{PortConfig, PortInput};
use tracing::{debug, warn};

use crate::cmd::{spawn_reader, MonitorArgs};
use crate::exit::{io_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS, USAGE};
use crate::output::{print_event, OutputFormat};

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// One queue for every selected kind, so output follows wire order.
const MONITOR_QUEUE_CAPACITY: usize = 512;

pub fn run(args: MonitorArgs, format: OutputFormat, config: CodecConfig) -> CliResult<i32> {
    let device = config.device_id;
    let coordinator = Arc::new(ConnectionCoordinator::new());
    coordinator.connect(config);

    let kinds: Vec<EventKind> = args.kind.iter().copied().map(EventKind::from).collect();
    let subscription = coordinator.subscribe_many(
        device,
        &kinds,
        QueueConfig::new(MONITOR_QUEUE_CAPACITY, Backpressure::DropOldest),
    );

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let input = match (&args.replay, &args.port) {
        (Some(path), _) => {
            let file = File::open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
            spawn_reader(file, Arc::clone(&coordinator), device);
            None
        }
        (None, Some(selector)) => {
            let port_config = PortConfig {
                client_name: args.client_name.clone(),
                ..PortConfig::default()
            };
            let inbound = Arc::clone(&coordinator);
            let input = PortInput::connect(selector, &port_config, move |bytes| {
                inbound.push_bytes(device, bytes);
            })
            .map_err(|err| transport_error(&format!("failed opening '{selector}'"), err))?;
            Some(input)
        }
        (None, None) => return Err(CliError::new(USAGE, "a port or --replay FILE is required")),
    };

    let printed = drain(&subscription, &running, args.count, |event| {
        print_event(device, event, format)
    });
    debug!(%device, printed, "monitor finished");

    if let Some(input) = input {
        input.close();
    }
    let dropped = subscription.dropped();
    if dropped > 0 {
        warn!(kinds = ?subscription.kinds(), dropped, "events dropped by backpressure");
    }
    Ok(SUCCESS)
}

/// Handle events in arrival order until `limit` events were handled, the
/// flag is cleared, or the subscription is closed and empty.
fn drain<F>(
    subscription: &Subscription,
    running: &AtomicBool,
    limit: Option<usize>,
    mut handle: F,
) -> usize
where
    F: FnMut(&Event),
{
    let mut handled = 0usize;
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|limit| handled >= limit) {
            break;
        }
        match subscription.recv_timeout(POLL_INTERVAL) {
            Some(event) => {
                handle(&event);
                handled = handled.saturating_add(1);
            }
            None if subscription.is_cancelled() && subscription.pending() == 0 => break,
            None => {}
        }
    }
    handled
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use synthex_codec::{encode_parameter_change, encode_program_dump, ParameterId, Program};

    use super::*;

    fn setup(kinds: &[EventKind]) -> (ConnectionCoordinator, Subscription, CodecConfig) {
        let config = CodecConfig::default();
        let coordinator = ConnectionCoordinator::new();
        coordinator.connect(config);
        let subscription = coordinator.subscribe_many(
            config.device_id,
            kinds,
            QueueConfig::new(MONITOR_QUEUE_CAPACITY, Backpressure::DropOldest),
        );
        (coordinator, subscription, config)
    }

    #[test]
    fn drains_until_disconnect() {
        let (coordinator, subscription, config) =
            setup(&[EventKind::Message, EventKind::ParameterChange]);
        let dump = encode_program_dump(&Program::new(), 1, &config).expect("dump should encode");
        let cc = encode_parameter_change(0, ParameterId::Cutoff, 40).expect("cc should encode");
        coordinator.push_bytes(config.device_id, &dump);
        coordinator.push_bytes(config.device_id, &cc);
        coordinator.disconnect(config.device_id);

        let running = AtomicBool::new(true);
        let mut kinds = Vec::new();
        let handled = drain(&subscription, &running, None, |event| kinds.push(event.kind()));
        assert_eq!(handled, 2);
        assert_eq!(kinds, vec![EventKind::Message, EventKind::ParameterChange]);
    }

    #[test]
    fn events_keep_wire_order_across_kinds() {
        let (coordinator, subscription, config) =
            setup(&[EventKind::Message, EventKind::ParameterChange, EventKind::Note]);
        let dump = encode_program_dump(&Program::new(), 1, &config).expect("dump should encode");
        let cc = encode_parameter_change(0, ParameterId::Cutoff, 90).expect("cc should encode");
        let mut stream = vec![0x90, 60, 100];
        stream.extend_from_slice(&dump);
        stream.extend_from_slice(&cc);
        stream.extend_from_slice(&[0x80, 60, 0]);
        coordinator.push_bytes(config.device_id, &stream);
        coordinator.disconnect(config.device_id);

        let running = AtomicBool::new(true);
        let mut kinds = Vec::new();
        drain(&subscription, &running, None, |event| kinds.push(event.kind()));
        assert_eq!(
            kinds,
            vec![
                EventKind::Note,
                EventKind::Message,
                EventKind::ParameterChange,
                EventKind::Note,
            ]
        );
    }

    #[test]
    fn stops_at_count() {
        let (coordinator, subscription, config) = setup(&[EventKind::ParameterChange]);
        for value in 0..5 {
            let cc = encode_parameter_change(0, ParameterId::Resonance, value)
                .expect("cc should encode");
            coordinator.push_bytes(config.device_id, &cc);
        }

        let running = AtomicBool::new(true);
        let mut values = Vec::new();
        let handled = drain(&subscription, &running, Some(3), |event| {
            if let Event::ParameterChange(change) = event {
                values.push(change.value);
            }
        });
        assert_eq!(handled, 3);
        assert_eq!(values, vec![0, 1, 2]);
    }

    #[test]
    fn cleared_flag_stops_immediately() {
        let (_coordinator, subscription, _config) = setup(&[EventKind::Note]);
        let running = AtomicBool::new(false);
        assert_eq!(drain(&subscription, &running, None, |_| {}), 0);
    }
}
