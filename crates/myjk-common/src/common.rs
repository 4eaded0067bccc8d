// common.rs -- console printing shared by every server module

// ============================================================
// Com_Printf / Com_DPrintf
// ============================================================

/// General-purpose print. Every message becomes an `info` event on the
/// `console` target.
pub fn com_printf(msg: &str) {
    tracing::info!(target: "console", "{}", msg.trim_end());
}

/// Developer-only print. Demoted to a `debug` event unless the
/// "developer" cvar is set.
pub fn com_dprintf(msg: &str) {
    if crate::cvar::cvar_variable_value("developer") == 0.0 {
        tracing::debug!(target: "console", "{}", msg.trim_end());
        return;
    }
    com_printf(msg);
}
