//! Cart collaborator.
//!
//! The orchestrator only needs [`CartSink::add_item`]; [`Cart`] is the
//! in-memory implementation used by the CLI and tests.

use serde::Serialize;
use thali_core::config::PricingConfig;
use thali_core::CartLine;
use tracing::debug;

/// Receives items the agent commits on the customer's behalf.
///
/// One call adds one unit. Implementations merge repeated names into a
/// single line and increment its quantity.
pub trait CartSink: Send {
    fn add_item(&mut self, name: &str, price: f64);
}

/// Totals for the current cart contents, rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CartTotals {
    pub subtotal: f64,
    pub tax: f64,
    pub delivery_fee: f64,
    pub total: f64,
}

/// In-memory cart keeping `line_subtotal == quantity * unit_price`.
#[derive(Debug, Clone)]
pub struct Cart {
    lines: Vec<CartLine>,
    pricing: PricingConfig,
}

impl Default for Cart {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}

impl Cart {
    pub fn new(pricing: PricingConfig) -> Self {
        Self {
            lines: Vec::new(),
            pricing,
        }
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn quantity_of(&self, name: &str) -> u32 {
        self.lines
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    /// Remove a line entirely. Returns false if no line had that name.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.name != name);
        self.lines.len() != before
    }

    /// Set a line's quantity; zero removes it. Returns false if no line had
    /// that name.
    pub fn set_quantity(&mut self, name: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(name);
        }
        match self.lines.iter_mut().find(|l| l.name == name) {
            Some(line) => {
                line.set_quantity(quantity);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn subtotal(&self) -> f64 {
        self.lines.iter().map(|l| l.line_subtotal).sum()
    }

    /// Subtotal plus tax plus delivery; delivery is waived at or above the
    /// free-delivery threshold and for an empty cart.
    pub fn totals(&self) -> CartTotals {
        let subtotal = self.subtotal();
        let tax = subtotal * self.pricing.tax_rate;
        let delivery_fee = if self.lines.is_empty() || subtotal >= self.pricing.free_delivery_threshold
        {
            0.0
        } else {
            self.pricing.delivery_fee
        };
        CartTotals {
            subtotal: round2(subtotal),
            tax: round2(tax),
            delivery_fee: round2(delivery_fee),
            total: round2(subtotal + tax + delivery_fee),
        }
    }
}

impl CartSink for Cart {
    fn add_item(&mut self, name: &str, price: f64) {
        match self.lines.iter_mut().find(|l| l.name == name) {
            Some(line) => {
                let quantity = line.quantity + 1;
                line.set_quantity(quantity);
            }
            None => self.lines.push(CartLine::new(name, price)),
        }
        debug!(item = name, price, "Cart item added");
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
