#![allow(clippy::too_many_arguments, clippy::float_cmp, clippy::needless_range_loop,
         clippy::manual_range_contains, clippy::unnecessary_map_or)]

// Server world queries: entity links, area queries, traces, point contents

pub mod error;
pub mod server;
pub mod sv_game;
pub mod sv_ghoul2;
pub mod sv_trace;
pub mod sv_world;

#[cfg(test)]
mod test_support;
