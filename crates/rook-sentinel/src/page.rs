//! Seams to the host page and the outside world.

use tokio::sync::mpsc;

use crate::notation::MoveNode;
use crate::types::{InboundRequest, OutboundMessage, PageUrlResponse, SentinelResult};

/// Address and markup read together at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLoad {
    pub url: String,
    pub document: Option<String>,
}

/// The live page being watched.
pub trait Page: Send + Sync {
    /// Current address of the page.
    fn url(&self) -> String;

    /// Current document markup, or `None` if the page is not available.
    fn document(&self) -> Option<String>;

    /// Address and document in one read. Pages where each access is costly
    /// should override this.
    fn load(&self) -> PageLoad {
        PageLoad {
            url: self.url(),
            document: self.document(),
        }
    }

    /// Subscribe to nodes appended to the move-list container.
    ///
    /// `selectors` are tried in order to locate the container. Returns `None`
    /// when none matches. The receiver closes once the container is detached
    /// from the page.
    fn observe_move_list(&self, selectors: &[String]) -> Option<mpsc::UnboundedReceiver<MoveNode>>;
}

/// Outbound notification channel to other parts of the system.
pub trait Notifier: Send + Sync {
    /// Deliver a message. Fails when nobody is listening.
    fn notify(&self, message: &OutboundMessage) -> SentinelResult<()>;
}

/// Notifier that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _message: &OutboundMessage) -> SentinelResult<()> {
        Ok(())
    }
}

/// Answer a request from an external collaborator.
pub fn respond(page: &dyn Page, request: &InboundRequest) -> PageUrlResponse {
    match request {
        InboundRequest::ExtractPageUrl => PageUrlResponse { url: page.url() },
    }
}
