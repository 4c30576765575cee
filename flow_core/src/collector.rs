use crate::source::TransactionSource;
use crate::timeframe::is_within_window;
use crate::types::RawTransaction;
use crate::Result;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Pages a transaction source backwards in time and keeps the transactions
/// that fall inside a time window.
pub struct WindowCollector<'a> {
    source: &'a dyn TransactionSource,
    page_size: u32,
}

impl<'a> WindowCollector<'a> {
    pub fn new(source: &'a dyn TransactionSource, page_size: u32) -> Self {
        Self {
            source,
            page_size: page_size.max(1),
        }
    }

    /// Collect every transaction of `account_address` with
    /// `start_time <= block_time <= end_time`, oldest first.
    ///
    /// Paging stops at an empty page, at a short page, or as soon as a
    /// transaction older than `start_time` is seen. The source is assumed to
    /// serve transactions in non-increasing time order.
    pub async fn collect(
        &self,
        account_address: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Vec<RawTransaction>> {
        if start_time > end_time {
            debug!(
                "Window start {} is after end {}, nothing to collect",
                start_time, end_time
            );
            return Ok(Vec::new());
        }

        let start_ms = start_time.timestamp_millis();

        let mut collected = Vec::new();
        let mut before: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let page = self
                .source
                .get_page(account_address, self.page_size, before.as_deref())
                .await?;
            page_count += 1;

            if page.is_empty() {
                debug!("No more transactions available after {} pages", page_count);
                break;
            }

            let page_len = page.len();
            let next_cursor = page
                .last()
                .and_then(RawTransaction::primary_signature)
                .map(str::to_string);

            debug!(
                "Page {} returned {} transactions (before={:?})",
                page_count, page_len, before
            );

            let mut window_start_crossed = false;
            for transaction in page {
                let block_time_ms = transaction.block_time_millis();
                if block_time_ms < start_ms {
                    window_start_crossed = true;
                    break;
                }
                if is_within_window(block_time_ms, start_time, end_time) {
                    collected.push(transaction);
                }
            }

            if window_start_crossed {
                debug!("Reached transaction older than window start, stopping");
                break;
            }

            if page_len < self.page_size as usize {
                debug!("Short page ({} < {}), end of history", page_len, self.page_size);
                break;
            }

            match next_cursor {
                Some(cursor) if before.as_deref() == Some(cursor.as_str()) => {
                    warn!("Source returned the same cursor {} twice, stopping", cursor);
                    break;
                }
                Some(cursor) => before = Some(cursor),
                None => {
                    warn!("Last transaction of page {} has no signature, stopping", page_count);
                    break;
                }
            }
        }

        collected.sort_by_key(|tx| tx.block_time);

        debug!(
            "Collected {} transactions for {} across {} pages",
            collected.len(),
            account_address,
            page_count
        );

        Ok(collected)
    }
}
