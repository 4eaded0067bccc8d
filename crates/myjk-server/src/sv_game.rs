// sv_game.rs -- server-side view of the entities the game module shares
//
// The entity array itself belongs to the game; the world code only reads
// the geometry it needs and writes back the link bookkeeping (absmin/absmax,
// the packed solid, linkcount, the linked flag).

use myjk_common::q_shared::*;

use crate::sv_ghoul2::G2Handle;

// ============================================================
// Server flags (svFlags)
// ============================================================

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SvFlags: i32 {
        const NOCLIENT           = 0x00000001; // don't send entity to clients, even if it has effects
        const BOT                = 0x00000008; // set if the entity is a bot
        const PLAYER_USABLE      = 0x00000010; // player can use this with the use button
        const BROADCAST          = 0x00000020; // send to all connected clients
        const PORTAL             = 0x00000040; // merge a second pvs at origin2 into snapshots
        const USE_CURRENT_ORIGIN = 0x00000080; // entity->r.currentOrigin instead of entity->s.origin
        const SINGLECLIENT       = 0x00000100; // only send to a single client
        const NOSERVERINFO       = 0x00000200; // don't send CS_SERVERINFO updates to this client
        const CAPSULE            = 0x00000400; // use capsule for collision detection instead of bbox
        const NOTSINGLECLIENT    = 0x00000800; // send entity to everyone but one client
        const OWNERNOTSHARED     = 0x00001000; // collide with traces from the owner's other projectiles
    }
}

// entity_state eFlags the world code looks at
pub const EF_DEAD: i32 = 0x00000001; // don't draw a foe marker over players with EF_DEAD

/// `entity_state.solid` value reserved for brush models. A packed bbox
/// never produces it.
pub const SOLID_BMODEL: i32 = 0xffffff;

// ============================================================
// entityType_t
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum EntityType {
    #[default]
    General = 0,
    Player,
    Item,
    Missile,
    Special,
    Holocron,
    Mover,
    Beam,
    Portal,
    Speaker,
    PushTrigger,
    TeleportTrigger,
    Invisible,
    Npc,
    Team,
    Body,
    Terrain,
    Fx,
}

// ============================================================
// EntityState -- the networked part the world code touches
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntityState {
    pub number: i32,
    pub e_type: EntityType,
    pub e_flags: i32,
    /// Packed bbox for client-side prediction, see `encode_solid`.
    pub solid: i32,
    pub modelindex: i32,
    /// Base of the angle trajectory; clients keep their view angles here.
    pub apos_base: Vec3,
}

impl Default for EntityState {
    fn default() -> Self {
        Self {
            number: 0,
            e_type: EntityType::General,
            e_flags: 0,
            solid: 0,
            modelindex: 0,
            apos_base: [0.0; 3],
        }
    }
}

// ============================================================
// SharedEntity -- one slot of the game's entity array
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SharedEntity {
    pub s: EntityState,

    pub linked: bool, // false if not in any good cluster
    pub linkcount: i32,

    pub svflags: SvFlags,

    /// If false, assume an explicit mins / maxs bounding box;
    /// only set by trap_SetBrushModel.
    pub bmodel: bool,

    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: i32, // CONTENTS_TRIGGER, CONTENTS_SOLID, CONTENTS_BODY, etc

    // derived from mins/maxs and origin + rotation
    pub absmin: Vec3,
    pub absmax: Vec3,

    pub current_origin: Vec3,
    pub current_angles: Vec3,

    /// When a trace call is made and the pass entity isn't ENTITYNUM_NONE,
    /// an entity will be excluded from testing if its owner is the pass
    /// entity, or if the pass entity owns it.
    pub owner_num: i32,

    pub ghoul2: Option<G2Handle>,
    pub model_scale: Vec3,

    /// NPC with a vehicle attached.
    pub vehicle: bool,
}

impl Default for SharedEntity {
    fn default() -> Self {
        Self {
            s: EntityState::default(),
            linked: false,
            linkcount: 0,
            svflags: SvFlags::empty(),
            bmodel: false,
            mins: [0.0; 3],
            maxs: [0.0; 3],
            contents: 0,
            absmin: [0.0; 3],
            absmax: [0.0; 3],
            current_origin: [0.0; 3],
            current_angles: [0.0; 3],
            owner_num: ENTITYNUM_NONE,
            ghoul2: None,
            model_scale: [1.0; 3],
            vehicle: false,
        }
    }
}

impl SharedEntity {
    pub fn new(number: usize) -> Self {
        let mut ent = Self::default();
        ent.s.number = number as i32;
        ent
    }

    pub fn is_missile(&self) -> bool {
        self.s.e_type == EntityType::Missile
    }

    pub fn owner_shared(&self) -> bool {
        !self.svflags.contains(SvFlags::OWNERNOTSHARED)
    }
}

/// Allocate `count` blank entity slots numbered by position.
pub fn make_entities(count: usize) -> Vec<SharedEntity> {
    (0..count).map(SharedEntity::new).collect()
}
