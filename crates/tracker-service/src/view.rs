//! Table view of a running session.
//!
//! Subscribes to the session event bus and prints the order table every
//! time the collection changes. Everything else is logged.

use std::fmt::Write;
use tokio::sync::broadcast::{self, error::RecvError};
use tracker_core::{OrderCollection, SyncEvent};
use tracker_types::{status_options, utils::status_label, Order, StatusFilter};

const HEADERS: [&str; 6] = ["ORDER ID", "STATUS", "CUSTOMER", "PRODUCT", "MERCHANT", "UPDATED"];
const PLACEHOLDER: &str = "-";

/// Renders the collection as a fixed-width text table.
pub fn render_table(filter: &StatusFilter, orders: &OrderCollection) -> String {
	let rows: Vec<[String; 6]> = orders.iter().map(row).collect();

	let mut widths = HEADERS.map(str::len);
	for row in &rows {
		for (width, cell) in widths.iter_mut().zip(row) {
			*width = (*width).max(cell.chars().count());
		}
	}

	let mut out = String::new();
	let _ = writeln!(out, "{} ({} orders)", filter_title(filter), rows.len());
	push_line(&mut out, &HEADERS.map(str::to_string), &widths);
	for row in &rows {
		push_line(&mut out, row, &widths);
	}
	out
}

fn filter_title(filter: &StatusFilter) -> String {
	match filter {
		StatusFilter::Active => "ACTIVE ORDERS".to_string(),
		StatusFilter::Status(status) => status_label(status.as_str()),
	}
}

fn row(order: &Order) -> [String; 6] {
	let text = |value: &Option<String>| value.clone().unwrap_or_else(|| PLACEHOLDER.to_string());
	[
		order.order_id.clone(),
		status_label(order.current_status.as_str()),
		text(&order.customer_name),
		text(&order.product_name),
		text(&order.merchant_name),
		order
			.updated_at
			.map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
			.unwrap_or_else(|| PLACEHOLDER.to_string()),
	]
}

fn push_line(out: &mut String, cells: &[String; 6], widths: &[usize; 6]) {
	let line = cells
		.iter()
		.zip(widths)
		.map(|(cell, width)| format!("{:<width$}", cell, width = *width))
		.collect::<Vec<_>>()
		.join("  ");
	out.push_str(line.trim_end());
	out.push('\n');
}

/// Renders the selectable filters, one per line.
pub fn render_status_options(statuses: &[tracker_types::OrderStatus]) -> String {
	status_options(statuses)
		.into_iter()
		.map(|option| format!("  {:<24} filter {}\n", option.label, option.value))
		.collect()
}

/// Observes session events until the bus closes.
pub async fn run(mut events: broadcast::Receiver<SyncEvent>) {
	loop {
		match events.recv().await {
			Ok(event) => show(event),
			Err(RecvError::Lagged(skipped)) => {
				tracing::warn!(skipped, "View fell behind; waiting for the next table");
			},
			Err(RecvError::Closed) => break,
		}
	}
}

fn show(event: SyncEvent) {
	match event {
		SyncEvent::CollectionChanged { filter, orders } => {
			println!("{}", render_table(&filter, &orders));
		},
		SyncEvent::StatusesLoaded { statuses } => {
			tracing::info!(count = statuses.len(), "Loaded status filters");
			print!("{}", render_status_options(&statuses));
		},
		SyncEvent::SnapshotFailed { reason } => {
			tracing::warn!(reason = %reason, "Snapshot unavailable");
		},
		SyncEvent::ConnectionOpened => tracing::info!("Live updates connected"),
		SyncEvent::ConnectionError { reason } => {
			tracing::warn!(reason = %reason, "Live updates error");
		},
		SyncEvent::ConnectionClosed => {
			tracing::warn!("Live updates disconnected; type 'reconnect' to retry");
		},
		SyncEvent::LiveUpdatesUnavailable => {
			tracing::warn!("No session token; live updates disabled");
		},
		SyncEvent::FrameRejected { reason } => {
			tracing::debug!(reason = %reason, "Dropped live update");
		},
		SyncEvent::FilterRejected { filter, reason } => {
			tracing::warn!(filter = %filter, reason = %reason, "Filter rejected");
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::{TimeZone, Utc};
	use tracker_types::OrderStatus;

	fn order(id: &str, status: &str) -> Order {
		Order {
			order_id: id.to_string(),
			merchant_name: Some("Corner Shop".to_string()),
			customer_name: Some("Jane".to_string()),
			customer_contact: None,
			customer_address: None,
			product_name: Some("Desk lamp".to_string()),
			current_status: OrderStatus::new(status),
			created_at: None,
			updated_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()),
		}
	}

	#[test]
	fn test_render_table_rows_in_collection_order() {
		let orders = OrderCollection::from_snapshot(vec![
			order("ORD-2", "picked_up"),
			order("ORD-1", "pending"),
		]);

		let table = render_table(&StatusFilter::Active, &orders);
		let lines: Vec<&str> = table.lines().collect();

		assert_eq!(lines[0], "ACTIVE ORDERS (2 orders)");
		assert!(lines[1].starts_with("ORDER ID"));
		assert!(lines[2].starts_with("ORD-2"));
		assert!(lines[2].contains("PICKED UP"));
		assert!(lines[2].contains("2024-05-01 10:00:00"));
		assert!(lines[3].starts_with("ORD-1"));
	}

	#[test]
	fn test_render_table_partial_order_uses_placeholder() {
		let mut partial = order("ORD-9", "delivered");
		partial.customer_name = None;
		partial.product_name = None;
		partial.merchant_name = None;
		partial.updated_at = None;
		let orders = OrderCollection::from_snapshot(vec![partial]);

		let table = render_table(
			&StatusFilter::Status(OrderStatus::new("delivered")),
			&orders,
		);
		let lines: Vec<&str> = table.lines().collect();

		assert_eq!(lines[0], "DELIVERED (1 orders)");
		let cells: Vec<&str> = lines[2].split_whitespace().collect();
		assert_eq!(cells, vec!["ORD-9", "DELIVERED", "-", "-", "-", "-"]);
	}

	#[test]
	fn test_render_empty_table() {
		let table = render_table(&StatusFilter::Active, &OrderCollection::default());
		assert_eq!(table.lines().count(), 2);
	}

	#[test]
	fn test_render_status_options() {
		let rendered = render_status_options(&[OrderStatus::new("picked_up")]);
		let lines: Vec<&str> = rendered.lines().collect();

		assert_eq!(lines.len(), 2);
		assert!(lines[0].contains("ACTIVE ORDERS"));
		assert!(lines[0].ends_with("filter ACTIVE"));
		assert!(lines[1].contains("PICKED UP"));
		assert!(lines[1].ends_with("filter picked_up"));
	}
}
