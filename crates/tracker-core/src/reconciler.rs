//! Folding of live order events into the local order collection.
//!
//! The collection keeps table order (snapshot order, then insertion order)
//! alongside an id index, so every `order_id` appears at most once no
//! matter how many events or snapshot duplicates arrive.

use std::collections::HashMap;
use tracker_types::{Order, OrderEvent, OrderStatus};

/// Result of folding one event into a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
	/// An existing order changed status.
	Updated { previous_status: OrderStatus },
	/// The order was unknown and a record was appended.
	Inserted,
}

/// Local copy of the orders shown to the user.
///
/// Read-only outside this crate; all mutation flows through the reconciler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderCollection {
	orders: Vec<Order>,
	index: HashMap<String, usize>,
}

impl OrderCollection {
	/// Creates an empty collection.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds a collection from a snapshot.
	///
	/// A repeated `order_id` overwrites the earlier record in its original
	/// position.
	pub fn from_snapshot(orders: Vec<Order>) -> Self {
		let mut collection = Self {
			orders: Vec::with_capacity(orders.len()),
			index: HashMap::with_capacity(orders.len()),
		};

		for order in orders {
			match collection.index.get(&order.order_id) {
				Some(&position) => {
					tracing::debug!(order_id = %order.order_id, "Duplicate order in snapshot");
					collection.orders[position] = order;
				},
				None => {
					collection
						.index
						.insert(order.order_id.clone(), collection.orders.len());
					collection.orders.push(order);
				},
			}
		}

		collection
	}

	pub fn len(&self) -> usize {
		self.orders.len()
	}

	pub fn is_empty(&self) -> bool {
		self.orders.is_empty()
	}

	/// Looks up an order by id.
	pub fn get(&self, order_id: &str) -> Option<&Order> {
		self.index
			.get(order_id)
			.and_then(|&position| self.orders.get(position))
	}

	pub fn contains(&self, order_id: &str) -> bool {
		self.index.contains_key(order_id)
	}

	/// Orders in table order.
	pub fn iter(&self) -> impl Iterator<Item = &Order> {
		self.orders.iter()
	}

	pub fn as_slice(&self) -> &[Order] {
		&self.orders
	}

	/// Applies one event in place.
	///
	/// A known order gets the new status and `updated_at` set to the event
	/// time, with every other field kept. An unknown order is appended as
	/// built from the event.
	pub(crate) fn upsert(&mut self, event: &OrderEvent) -> ApplyOutcome {
		match self.index.get(&event.order_id) {
			Some(&position) => {
				let order = &mut self.orders[position];
				let previous_status =
					std::mem::replace(&mut order.current_status, event.current_status.clone());
				order.updated_at = Some(event.timestamp);
				ApplyOutcome::Updated { previous_status }
			},
			None => {
				self.index
					.insert(event.order_id.clone(), self.orders.len());
				self.orders.push(event.to_order());
				ApplyOutcome::Inserted
			},
		}
	}
}

impl<'a> IntoIterator for &'a OrderCollection {
	type Item = &'a Order;
	type IntoIter = std::slice::Iter<'a, Order>;

	fn into_iter(self) -> Self::IntoIter {
		self.orders.iter()
	}
}

/// Folds `event` into `collection` and returns the result.
pub fn apply(mut collection: OrderCollection, event: &OrderEvent) -> OrderCollection {
	collection.upsert(event);
	collection
}
