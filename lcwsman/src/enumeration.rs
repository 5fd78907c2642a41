//! Enumeration pager: one Enumerate, then Pull until the end of sequence.

use tracing::debug;

use crate::client::WsmanClient;
use crate::errors::WsmanError;
use crate::soap::{Properties, PullBatch};
use crate::transport::Transport;

/// Iterator over the Pull batches of one enumeration.
///
/// Every Pull reuses the context returned by Enumerate. Iteration stops after
/// the batch flagged `end_of_sequence`, or after the first error.
pub struct Pager<'a, T: Transport> {
    client: &'a WsmanClient<T>,
    class: String,
    context: String,
    max_elements: u32,
    pulls: usize,
    done: bool,
}

impl<'a, T: Transport> Pager<'a, T> {
    pub(crate) fn start(
        client: &'a WsmanClient<T>,
        class: &str,
        max_elements: u32,
    ) -> Result<Self, WsmanError> {
        let context = client.enumeration_context(class)?;
        debug!(class, context = %context, "Enumeration started");

        Ok(Self {
            client,
            class: class.to_string(),
            context,
            max_elements,
            pulls: 0,
            done: false,
        })
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    /// Pull requests issued so far.
    pub fn pulls(&self) -> usize {
        self.pulls
    }

    /// Concatenates every remaining batch, in order.
    pub fn drain(mut self) -> Result<Vec<Properties>, WsmanError> {
        let mut items = Vec::new();
        for batch in &mut self {
            items.extend(batch?.items);
        }
        debug!(class = %self.class, pulls = self.pulls, items = items.len(), "Enumeration finished");
        Ok(items)
    }
}

impl<T: Transport> Iterator for Pager<'_, T> {
    type Item = Result<PullBatch, WsmanError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let result = self
            .client
            .pull(&self.class, &self.context, self.max_elements);
        self.pulls += 1;

        match &result {
            Ok(batch) => self.done = batch.end_of_sequence,
            Err(_) => self.done = true,
        }
        Some(result)
    }
}
