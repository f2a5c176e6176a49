//! Network collaborator - single request/response, no retry contract.
//!
//! Responses come back through `Engine::complete_request(ticket, result)`.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value;

use crate::types::Ticket;

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub url: String,
    pub query: Value,
}

pub trait Network {
    /// Issue a request. The engine waits for `ticket` to be completed.
    fn request(&mut self, request: Request, ticket: Ticket);
}

/// Headless network that queues requests for the caller to answer.
#[derive(Debug, Clone, Default)]
pub struct QueuedNetwork {
    queue: Rc<RefCell<Vec<(Ticket, Request)>>>,
}

impl QueuedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests not yet taken, oldest first.
    pub fn requests(&self) -> Vec<(Ticket, Request)> {
        self.queue.borrow().clone()
    }

    pub fn take(&self) -> Vec<(Ticket, Request)> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    pub fn last(&self) -> Option<(Ticket, Request)> {
        self.queue.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}

impl Network for QueuedNetwork {
    fn request(&mut self, request: Request, ticket: Ticket) {
        self.queue.borrow_mut().push((ticket, request));
    }
}
