use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use spool_primitives::{Position, TextRange};

use super::*;

fn buffer_with(text: &str) -> RopeBuffer {
	let mut buffer = RopeBuffer::new();
	buffer.set_value(text);
	buffer
}

fn end_of(buffer: &RopeBuffer) -> TextRange {
	let line = buffer.line_count();
	TextRange::point(Position::new(line, buffer.line_max_column(line)))
}

#[test]
fn edits_replace_ranges_and_clamp_out_of_bounds() {
	let mut buffer = buffer_with("hello\nworld");
	buffer.apply_edit(TextRange::from_coords(1, 1, 2, 1), "", false);
	assert_eq!(buffer.text(), "world");

	buffer.apply_edit(TextRange::from_coords(9, 9, 9, 99), "!", false);
	assert_eq!(buffer.text(), "world!");

	buffer.apply_edit(TextRange::from_coords(0, 0, 1, 1), ">", false);
	assert_eq!(buffer.text(), ">world!");
}

#[test]
fn lines_exclude_terminators() {
	let buffer = buffer_with("a\r\nb\n");
	assert_eq!(buffer.lines(), vec!["a", "b", ""]);
	assert_eq!(buffer.line_count(), 3);
}

#[test]
fn decoration_ranges_follow_edits() {
	let mut buffer = buffer_with("one\ntwo\n");
	let ids = buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(2, 1, 2, 4), "err")]);
	let id = ids[0];

	buffer.apply_edit(TextRange::from_coords(1, 1, 2, 1), "", true);
	assert_eq!(buffer.decoration(id).unwrap().range, TextRange::from_coords(1, 1, 1, 4));

	buffer.apply_edit(TextRange::point(Position::new(1, 1)), "zero\n", true);
	assert_eq!(buffer.decoration(id).unwrap().range, TextRange::from_coords(2, 1, 2, 4));
}

#[test]
fn appending_at_decoration_end_does_not_grow_it() {
	let mut buffer = buffer_with("err");
	let id = buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(1, 1, 1, 4), "err")])[0];

	let end = end_of(&buffer);
	buffer.apply_edit(end, "ok", true);
	assert_eq!(buffer.text(), "errok");
	assert_eq!(buffer.decoration(id).unwrap().range, TextRange::from_coords(1, 1, 1, 4));
}

#[test]
fn move_markers_pushes_decorations_starting_at_insertion_point() {
	let mut buffer = buffer_with("ab");
	let id = buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(1, 2, 1, 3), "w")])[0];

	buffer.apply_edit(TextRange::point(Position::new(1, 2)), "xx", true);
	assert_eq!(buffer.text(), "axxb");
	assert_eq!(buffer.decoration(id).unwrap().range, TextRange::from_coords(1, 4, 1, 5));
}

#[test]
fn deleted_decorations_collapse_to_edit_start() {
	let mut buffer = buffer_with("gone\nkept");
	let id = buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(1, 1, 1, 5), "err")])[0];
	buffer.apply_edit(TextRange::from_coords(1, 1, 2, 1), "", true);
	let range = buffer.decoration(id).unwrap().range;
	assert!(range.is_empty());
	assert_eq!(range.start, Position::new(1, 1));
}

#[test]
fn decorations_in_lines_filters_by_intersection() {
	let mut buffer = buffer_with("a\nb\nc\n");
	let ids = buffer.add_decorations(vec![
		Decoration::new(TextRange::from_coords(1, 1, 1, 2), "x"),
		Decoration::new(TextRange::from_coords(2, 1, 3, 2), "x"),
		Decoration::new(TextRange::from_coords(3, 1, 3, 2), "x"),
	]);
	assert_eq!(buffer.decorations_in_lines(1, 1), vec![ids[0]]);
	assert_eq!(buffer.decorations_in_lines(2, 2), vec![ids[1]]);
	assert_eq!(buffer.decorations_in_lines(1, 3), ids);
}

#[test]
fn set_value_drops_decorations() {
	let mut buffer = buffer_with("x");
	buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(1, 1, 1, 2), "x")]);
	buffer.set_value("");
	assert_eq!(buffer.decoration_count(), 0);
	assert_eq!(buffer.text(), "");
	assert_eq!(buffer.line_count(), 1);
}

#[test]
fn removing_unknown_decorations_is_ignored() {
	let mut buffer = buffer_with("x");
	let ids = buffer.add_decorations(vec![Decoration::new(TextRange::from_coords(1, 1, 1, 2), "x")]);
	buffer.remove_decorations(&[spool_primitives::DecorationId(999)]);
	assert_eq!(buffer.decoration_count(), 1);
	buffer.remove_decorations(&ids);
	assert_eq!(buffer.decoration_count(), 0);
}

#[tokio::test]
async fn slot_resolves_once_bound() {
	let slot = Arc::new(BufferSlot::new("build"));
	let s = Arc::clone(&slot);
	let waiter = tokio::spawn(async move { s.resolve().await.map(|buffer| buffer.lock().text()) });

	tokio::time::sleep(Duration::from_millis(10)).await;
	assert!(!waiter.is_finished());
	assert!(!slot.is_settled());

	assert!(slot.bind(Ok(buffer_with("ready").shared())));
	assert!(!slot.bind(Ok(RopeBuffer::new().shared())), "slot binds once");
	assert_eq!(waiter.await.unwrap().unwrap(), "ready");
}

#[tokio::test]
async fn slot_reports_creation_failure() {
	let slot = BufferSlot::new("build");
	slot.bind(Err("model service offline".to_string()));
	match slot.resolve().await {
		Err(OutputError::BufferUnavailable { channel, reason }) => {
			assert_eq!(channel, "build");
			assert_eq!(reason, "model service offline");
		}
		other => panic!("expected BufferUnavailable, got {:?}", other.map(|_| ())),
	}
}

#[tokio::test]
async fn released_slot_fails_pending_resolution() {
	let slot = Arc::new(BufferSlot::new("build"));
	let s = Arc::clone(&slot);
	let waiter = tokio::spawn(async move { s.resolve().await.map(|_| ()) });
	tokio::task::yield_now().await;

	assert!(slot.release().is_none());
	assert!(matches!(waiter.await.unwrap(), Err(OutputError::ChannelDisposed(name)) if name == "build"));
	assert!(!slot.bind(Ok(RopeBuffer::new().shared())));
	assert!(slot.get().is_none());
}

#[tokio::test]
async fn provider_honors_eol_and_delay() {
	let provider = RopeBufferProvider::new().eol("\r\n").delay(Duration::from_millis(5));
	let buffer = provider.create("build").await.unwrap();
	assert_eq!(buffer.lock().eol(), "\r\n");
}
