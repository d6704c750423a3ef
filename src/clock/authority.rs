/// Who a connected session is with respect to a game's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owns the game; sole writer of its timer record.
    Creator,
    /// Read-only follower.
    Viewer,
}

impl Role {
    /// Whether the session may write the timer record.
    pub fn can_write(self) -> bool {
        matches!(self, Role::Creator)
    }
}

/// Compare the session identity with the game's creator.
///
/// Missing or blank identities on either side resolve to [`Role::Viewer`].
pub fn resolve(session: Option<&str>, creator: Option<&str>) -> Role {
    match (normalise(session), normalise(creator)) {
        (Some(session), Some(creator)) if session == creator => Role::Creator,
        _ => Role::Viewer,
    }
}

fn normalise(identity: Option<&str>) -> Option<&str> {
    identity.map(str::trim).filter(|value| !value.is_empty())
}
