mod utils;

use midi_file::file::SmfFile;
use midi_file::mthd::{Division, Format, FrameRate, Mthd, QuarterNoteDivision, SmpteDivision};
use midi_file::track::{Track, TrackEvent};
use midi_file::ParseOptions;
use utils::enable_logging;

fn one_track_file(header: Mthd, track: Track) -> SmfFile {
    let mut file = SmfFile::new(header);
    file.push_track(track);
    file
}

#[test]
fn program_change_carries_a_single_data_byte() {
    enable_logging();
    let mut track = Track::new();
    track.push(TrackEvent::channel_event(0, 0xC0, 5, 0x28, None));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();
    let reparsed = SmfFile::from_slice(&bytes).unwrap();

    let ev = reparsed.track(0).unwrap().events().next().unwrap();
    let view = ev.as_channel_event().unwrap();
    assert_eq!(0xC0, view.status_nibble);
    assert_eq!(5, view.channel);
    assert_eq!(0x28, view.p1);
    assert_eq!(None, view.p2);
}

#[test]
fn sysex_event_round_trips_through_a_full_file() {
    let mut track = Track::new();
    track.push(TrackEvent::sysex(0, 0xF0, &[0x43, 0x12, 0x00, 0x07]));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();
    let reparsed = SmfFile::from_slice(&bytes).unwrap();

    let ev = reparsed.track(0).unwrap().events().next().unwrap();
    let view = ev.as_sysex().unwrap();
    assert_eq!(0xF0, view.status);
    assert_eq!(&[0x43, 0x12, 0x00, 0x07], ev.payload());
}

#[test]
fn smpte_division_survives_a_full_file_round_trip() {
    let header = Mthd::new(
        Format::Multi,
        1,
        Division::Smpte(SmpteDivision {
            frame_rate: FrameRate::N30,
            subframes: 80,
        }),
    );
    let mut track = Track::new();
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(header, track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();
    let reparsed = SmfFile::from_slice(&bytes).unwrap();
    assert_eq!(file.header().division(), reparsed.header().division());
}

#[test]
fn large_meta_payload_is_clamped_by_parse_options() {
    // Write a text meta event with a 64-byte payload, then read it back with a cap of 8: the
    // parser should silently truncate rather than error, since plenty of input remains.
    let mut track = Track::new();
    let payload = vec![b'x'; 64];
    track.push(TrackEvent::meta(0, 0x01, &payload));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();

    let opts = ParseOptions::new(8);
    let reparsed = SmfFile::from_slice_with_options(&bytes, &opts).unwrap();
    let ev = reparsed.track(0).unwrap().events().next().unwrap();
    assert_eq!(8, ev.as_meta().unwrap().length);
    assert_eq!(&payload[..8], ev.payload());
}

#[test]
fn reads_from_a_streaming_reader_too() {
    let mut track = Track::new();
    track.push(TrackEvent::channel_event(0, 0x90, 0, 60, Some(80)));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();

    let cursor = std::io::Cursor::new(bytes);
    let reparsed = SmfFile::read(cursor).unwrap();
    assert_eq!(file, reparsed);
}

#[test]
fn many_tracks_preserve_order() {
    enable_logging();
    let mut file = SmfFile::new(Mthd::new(Format::Multi, 4, Division::QuarterNote(QuarterNoteDivision::new(480))));
    for i in 0..4u8 {
        let mut track = Track::new();
        track.push(TrackEvent::meta(0, 0x03, format!("track {}", i).as_bytes()));
        track.push(TrackEvent::channel_event(0, 0x90, i, 60 + i, Some(100)));
        track.push(TrackEvent::end_of_track(0));
        file.push_track(track);
    }

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();
    let reparsed = SmfFile::from_slice(&bytes).unwrap();

    assert_eq!(4, reparsed.tracks_len());
    for (i, track) in reparsed.tracks().enumerate() {
        let name = track.events().next().unwrap().text_payload().unwrap();
        assert_eq!(format!("track {}", i), name.to_string());
    }
}

#[test]
fn truncated_input_reports_an_error_rather_than_panicking() {
    let mut track = Track::new();
    track.push(TrackEvent::channel_event(0, 0x90, 0, 60, Some(90)));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);

    let mut bytes = Vec::new();
    file.write(&mut bytes).unwrap();
    bytes.truncate(bytes.len() - 3);

    assert!(SmfFile::from_slice(&bytes).is_err());
}

#[test]
fn save_then_load_round_trips_through_the_filesystem() {
    let td = tempfile::TempDir::new().unwrap();
    let path = td.path().join("output.mid");

    let mut track = Track::new();
    track.push(TrackEvent::channel_event(0, 0x90, 0, 60, Some(90)));
    track.push(TrackEvent::end_of_track(0));
    let file = one_track_file(Mthd::new(Format::Multi, 1, Division::default()), track);
    file.save(&path).unwrap();

    let reloaded = SmfFile::load(&path).unwrap();
    assert_eq!(file, reloaded);
}
