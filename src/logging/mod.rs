//! Structured audit logging for stock movements.
//!
//! Diagnostics go through `tracing`; this logger keeps a separate,
//! key-value audit trail of every movement the ledgers accept or reject.

use slog::{o, Discard, Drain, Logger};
use slog_async::Async;
use slog_term::{FullFormat, PlainDecorator, TermDecorator};

use crate::models::TransactionType;

/// Configuration for setting up the logger
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub async_buffer_size: usize,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            async_buffer_size: 1024,
            use_color: true,
        }
    }
}

/// Sets up a terminal logger with configurable options
pub fn setup_logger(config: LoggerConfig) -> Logger {
    let decorator = {
        let builder = TermDecorator::new().stderr();
        let builder = if config.use_color {
            builder.force_color()
        } else {
            builder.force_plain()
        };
        builder.build()
    };

    let drain = FullFormat::new(decorator).build().fuse();

    let drain = Async::new(drain)
        .chan_size(config.async_buffer_size)
        .build()
        .fuse();

    Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Logger that writes plain lines into any writer, synchronously.
pub fn plain_logger<W>(writer: W) -> Logger
where
    W: std::io::Write + Send + 'static,
{
    let decorator = PlainDecorator::new(writer);
    let drain = FullFormat::new(decorator).build().fuse();
    let drain = std::sync::Mutex::new(drain).fuse();
    Logger::root(drain, o!())
}

/// Logger that drops everything.
pub fn discard_logger() -> Logger {
    Logger::root(Discard, o!())
}

/// Audit trail for ledger movements.
#[derive(Clone)]
pub struct StockAudit {
    logger: Logger,
}

impl StockAudit {
    pub fn new(logger: Logger, variant: &'static str) -> Self {
        Self {
            logger: logger.new(o!("ledger" => variant)),
        }
    }

    pub fn discard() -> Self {
        Self::new(discard_logger(), "discard")
    }

    pub fn accepted(
        &self,
        item_id: &str,
        kind: TransactionType,
        quantity: i64,
        old_stock: i64,
        new_stock: i64,
    ) {
        slog::info!(
            self.logger,
            "stock movement recorded";
            "item_id" => item_id,
            "type" => kind.as_ref(),
            "quantity" => quantity,
            "old_stock" => old_stock,
            "new_stock" => new_stock,
        );
    }

    pub fn rejected(&self, item_id: &str, kind: TransactionType, quantity: i64, reason: &str) {
        slog::warn!(
            self.logger,
            "stock movement rejected";
            "item_id" => item_id,
            "type" => kind.as_ref(),
            "quantity" => quantity,
            "reason" => reason,
        );
    }
}
