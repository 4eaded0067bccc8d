// server.rs -- core server types shared by the world query modules

// ============================================================
// server_state_t
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
#[derive(Default)]
pub enum ServerState {
    #[default]
    Dead = 0,    // no map loaded
    Loading = 1, // spawning level entities
    Game = 2,    // actively running
}
