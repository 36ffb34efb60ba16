//! Navigation-host capability.
//!
//! The session controller never touches global navigation state directly;
//! it asks the host to intercept leave attempts while an attempt is open
//! and to route away once submission succeeds. Tests assert the
//! register/unregister pairing with a recording implementation.

/// Capability surface of whatever owns routing and unload events.
pub trait NavigationHost: Send + Sync {
    /// Push a history checkpoint so back-navigation can be intercepted.
    fn push_checkpoint(&self);

    /// Start intercepting back-navigation and unload with a leave
    /// confirmation. Called exactly once per attempt start or resume.
    fn register_exit_guard(&self);

    /// Stop intercepting. Must leave no listener behind that could block
    /// unrelated future navigation.
    fn unregister_exit_guard(&self);

    /// Navigate to `route`.
    fn navigate_to(&self, route: &str);
}

/// Host that ignores navigation concerns, for headless embedding and tools.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullNavigationHost;

impl NavigationHost for NullNavigationHost {
    fn push_checkpoint(&self) {}

    fn register_exit_guard(&self) {}

    fn unregister_exit_guard(&self) {}

    fn navigate_to(&self, _route: &str) {}
}
