// End-to-end engine tests
//
// These drive a DscPanel over the in-memory transport and observe it only
// through the public API: what was written to the link and what the host
// collaborators were told.

use std::time::Duration;

use dsc_serial_bridge::codec::{checksum, decode, encode};
use dsc_serial_bridge::constants::CODE_ACK;
use dsc_serial_bridge::transport::command::send_and_wait;
use dsc_serial_bridge::transport::memory::frame;
use dsc_serial_bridge::{
    BridgeConfig, ConnectionState, DecodeError, DscPanel, EventDecoder, HostEvent,
    MemoryTransport, RecordingHost, RetryPolicy, SendOutcome, TroubleFlags, Transport, ZoneState,
};
use tokio::sync::watch;

fn config() -> BridgeConfig {
    BridgeConfig::builder()
        .serial_port("/dev/ttyS0")
        .code("1234")
        .build()
}

fn panel(link: &MemoryTransport, host: &RecordingHost) -> DscPanel<MemoryTransport> {
    DscPanel::new(link.clone(), host.collaborators(), config())
}

async fn connect(panel: &mut DscPanel<MemoryTransport>) {
    while panel.tick().await != ConnectionState::Poll {}
}

/// Tick until every scripted inbound line has been consumed.
async fn drain(panel: &mut DscPanel<MemoryTransport>, link: &MemoryTransport) {
    while link.pending_inbound() > 0 {
        panel.tick().await;
    }
}

fn feed(decoder: &mut EventDecoder, payload: &str) {
    decoder.handle_packet(&decode(&frame(payload)).unwrap());
}

#[test]
fn checksum_round_trip() {
    for payload in ["000", "001", "0561", "0401123400", "609001", "5500912030724", "0961C=072"] {
        let wire = String::from_utf8(encode(payload)).unwrap();
        assert!(wire.ends_with("\r\n"));
        let packet = decode(&wire).unwrap();
        assert_eq!(format!("{}{}", packet.code, packet.data), payload);
        assert_eq!(packet.checksum, checksum(payload));
    }
}

#[test]
fn checksum_sensitivity() {
    let payload = "609001";
    let good = checksum(payload);
    for bit in 0..8 {
        let line = format!("{}{:02X}", payload, good ^ (1 << bit));
        assert!(
            matches!(decode(&line), Err(DecodeError::ChecksumMismatch { .. })),
            "bit {bit} flip accepted"
        );
    }
}

#[test]
fn example_frame_with_bad_checksum_is_rejected() {
    assert!(matches!(
        decode("60900112E3"),
        Err(DecodeError::ChecksumMismatch {
            expected: 0x93,
            received: 0xE3
        })
    ));
    let packet = decode("60900130").unwrap();
    assert_eq!(packet.code, "609");
    assert_eq!(packet.data, "001");
}

#[tokio::test(start_paused = true)]
async fn retry_bound_is_exact() {
    let mut link = MemoryTransport::new();
    link.open("mem", 9600).await.unwrap();
    let mut decoder = EventDecoder::new(RecordingHost::new().collaborators());
    let (_tx, rx) = watch::channel(false);

    let policy = RetryPolicy::new(Duration::from_secs(3), 4);
    let outcome = send_and_wait(&mut link, &mut decoder, &rx, "001", CODE_ACK, policy).await;
    assert_eq!(outcome, SendOutcome::ExhaustedRetries);
    assert_eq!(link.written(), vec!["001"; 4]);
}

#[tokio::test(start_paused = true)]
async fn link_closed_short_circuits_and_reconnects() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;
    link.clear_written();

    link.close_link();
    panel.handle().disarm().unwrap();
    assert_eq!(panel.tick().await, ConnectionState::Init);
    assert!(link.written().is_empty());
    assert_eq!(panel.comm().queue().len(), 1);

    connect(&mut panel).await;
    panel.tick().await;
    assert_eq!(link.open_count(), 2);
    assert_eq!(link.written(), vec!["0561", "000", "001", "0401123400"]);
    assert!(panel.comm().queue().is_empty());
}

#[tokio::test(start_paused = true)]
async fn read_failure_reinitialises() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;

    link.close_link();
    assert_eq!(panel.tick().await, ConnectionState::Init);
    connect(&mut panel).await;
    assert_eq!(link.open_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn zone_stays_tripped_until_disarm() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;

    link.push_line("60900130");
    link.push_packet("6541");
    link.push_packet("6011001");
    link.push_packet("610001");
    drain(&mut panel, &link).await;

    let decoder = panel.comm().decoder();
    assert_eq!(decoder.zone_state(1), Some(ZoneState::Tripped));
    assert_eq!(decoder.tripped_zones(), &[1]);
    assert_eq!(
        host.zone_states(),
        vec![(1, ZoneState::Open), (1, ZoneState::Tripped)]
    );

    link.push_packet("6551");
    drain(&mut panel, &link).await;

    let decoder = panel.comm().decoder();
    assert_eq!(decoder.zone_state(1), Some(ZoneState::Closed));
    assert!(decoder.tripped_zones().is_empty());
    assert!(!decoder.alarm_active());
    assert_eq!(host.zone_states().last(), Some(&(1, ZoneState::Closed)));
    assert_eq!(host.tripped_reports(), vec![vec![(1, ZoneState::Open)]]);
}

#[tokio::test(start_paused = true)]
async fn zone_alarm_alone_holds_close_until_disarm() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;

    link.push_line("60900130");
    link.push_packet("6011001");
    link.push_packet("610001");
    drain(&mut panel, &link).await;

    let decoder = panel.comm().decoder();
    assert!(!decoder.alarm_active());
    assert_eq!(decoder.zone_state(1), Some(ZoneState::Tripped));
    assert_eq!(decoder.tripped_zones(), &[1]);

    link.push_packet("6551");
    drain(&mut panel, &link).await;

    let decoder = panel.comm().decoder();
    assert_eq!(decoder.zone_state(1), Some(ZoneState::Closed));
    assert!(decoder.tripped_zones().is_empty());
    assert_eq!(
        host.zone_states(),
        vec![
            (1, ZoneState::Open),
            (1, ZoneState::Tripped),
            (1, ZoneState::Closed)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn buffered_closes_apply_together() {
    let host = RecordingHost::new();
    let mut decoder = EventDecoder::new(host.collaborators());
    decoder.apply_config(&config());

    feed(&mut decoder, "6541");
    feed(&mut decoder, "6011003");
    feed(&mut decoder, "6011004");
    feed(&mut decoder, "610003");
    feed(&mut decoder, "610004");
    assert_eq!(decoder.zone_state(3), Some(ZoneState::Tripped));
    assert_eq!(decoder.zone_state(4), Some(ZoneState::Tripped));

    host.clear();
    feed(&mut decoder, "6551");
    let closes: Vec<_> = host
        .zone_states()
        .into_iter()
        .filter(|(_, s)| *s == ZoneState::Closed)
        .collect();
    assert_eq!(closes, vec![(3, ZoneState::Closed), (4, ZoneState::Closed)]);
}

#[tokio::test(start_paused = true)]
async fn trouble_clears_once_after_debounce() {
    let host = RecordingHost::new();
    let mut decoder = EventDecoder::new(host.collaborators());
    decoder.apply_config(&config());
    let now = tokio::time::Instant::now();

    let cleared = |host: &RecordingHost| {
        host.troubles()
            .into_iter()
            .filter(|t| t == "Trouble Code Cleared")
            .count()
    };

    feed(&mut decoder, "84902");
    feed(&mut decoder, "8411");
    for tick in 1..=9 {
        decoder.housekeeping(now);
        assert_eq!(decoder.trouble_flags(), TroubleFlags::AC_LOST, "tick {tick}");
        assert_eq!(cleared(&host), 0, "tick {tick}");
    }
    decoder.housekeeping(now);
    assert!(decoder.trouble_flags().is_empty());
    assert_eq!(cleared(&host), 1);

    for _ in 0..10 {
        decoder.housekeeping(now);
    }
    assert_eq!(cleared(&host), 1);
}

#[tokio::test(start_paused = true)]
async fn trouble_led_on_cancels_clear() {
    let host = RecordingHost::new();
    let mut decoder = EventDecoder::new(host.collaborators());
    decoder.apply_config(&config());
    let now = tokio::time::Instant::now();

    feed(&mut decoder, "84902");
    feed(&mut decoder, "8411");
    for _ in 0..5 {
        decoder.housekeeping(now);
    }
    feed(&mut decoder, "8401");
    for _ in 0..20 {
        decoder.housekeeping(now);
    }
    assert_eq!(decoder.trouble_flags(), TroubleFlags::AC_LOST);
    assert!(!host.troubles().iter().any(|t| t == "Trouble Code Cleared"));
}

#[tokio::test(start_paused = true)]
async fn repeated_disarm_is_not_deduplicated() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;
    link.clear_written();

    let handle = panel.handle();
    handle.disarm().unwrap();
    handle.disarm().unwrap();
    panel.tick().await;
    assert_eq!(panel.comm().queue().len(), 1);
    panel.tick().await;
    assert_eq!(link.written(), vec!["0401123400", "0401123400"]);
}

#[tokio::test(start_paused = true)]
async fn reload_picks_up_new_config() {
    let link = MemoryTransport::new().with_auto_ack();
    let host = RecordingHost::new();
    let mut panel = panel(&link, &host);
    connect(&mut panel).await;

    panel.handle().reload_config().unwrap();
    assert_eq!(panel.tick().await, ConnectionState::Startup);
    connect(&mut panel).await;
    assert_eq!(link.open_count(), 2);
    assert!(
        !host
            .events()
            .iter()
            .any(|e| matches!(e, HostEvent::Trouble(_)))
    );
}
