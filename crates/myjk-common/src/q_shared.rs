// q_shared.rs -- foundational types and functions shared by all modules

// ============================================================
// Basic types
// ============================================================

pub type Vec3 = [f32; 3];

#[allow(non_upper_case_globals)]
pub const vec3_origin: Vec3 = [0.0, 0.0, 0.0];

// angle indexes
pub const PITCH: usize = 0; // up / down
pub const YAW: usize = 1; // left / right
pub const ROLL: usize = 2; // fall over

// ============================================================
// Entity limits
// ============================================================

pub const MAX_CLIENTS: usize = 32;
pub const GENTITYNUM_BITS: u32 = 10;
pub const MAX_GENTITIES: usize = 1 << GENTITYNUM_BITS;

// entitynums are communicated with GENTITY_BITS, so any reserved
// values that are going to be communicated over the net need to
// also be in this range
pub const ENTITYNUM_NONE: i32 = MAX_GENTITIES as i32 - 1;
pub const ENTITYNUM_WORLD: i32 = MAX_GENTITIES as i32 - 2;
pub const ENTITYNUM_MAX_NORMAL: i32 = MAX_GENTITIES as i32 - 2;

/// Explicit cluster slots per entity; more than this falls back to the
/// overflow cluster.
pub const MAX_ENT_CLUSTERS: usize = 16;

/// Upper bound on mesh contacts reported for a single refinement pass.
pub const MAX_G2_COLLISIONS: usize = 16;

// ============================================================
// Content flags
// ============================================================

// lower bits are stronger, and will eat weaker brushes completely
pub const CONTENTS_NONE: i32 = 0x00000000;
pub const CONTENTS_SOLID: i32 = 0x00000001; // Default setting. An eye is never valid in a solid
pub const CONTENTS_LAVA: i32 = 0x00000002;
pub const CONTENTS_WATER: i32 = 0x00000004;
pub const CONTENTS_FOG: i32 = 0x00000008;
pub const CONTENTS_PLAYERCLIP: i32 = 0x00000010;
pub const CONTENTS_MONSTERCLIP: i32 = 0x00000020; // Physically block bots
pub const CONTENTS_BOTCLIP: i32 = 0x00000040; // A hint for bots - do not enter this brush by navigation
pub const CONTENTS_SHOTCLIP: i32 = 0x00000080;
pub const CONTENTS_BODY: i32 = 0x00000100; // should never be on a brush, only in game
pub const CONTENTS_CORPSE: i32 = 0x00000200; // should never be on a brush, only in game
pub const CONTENTS_TRIGGER: i32 = 0x00000400;
pub const CONTENTS_NODROP: i32 = 0x00000800; // don't leave bodies or items (death fog, lava)
pub const CONTENTS_TERRAIN: i32 = 0x00001000; // volume contains terrain data
pub const CONTENTS_LADDER: i32 = 0x00002000;
pub const CONTENTS_ABSEIL: i32 = 0x00004000; // (SOF2) used like ladder to define where an NPC can abseil
pub const CONTENTS_OPAQUE: i32 = 0x00008000; // defaults to on, when off, solid can be seen through
pub const CONTENTS_OUTSIDE: i32 = 0x00010000; // volume is considered to be in the outside (i.e. not indoors)
pub const CONTENTS_SLIME: i32 = 0x00020000;
pub const CONTENTS_LIGHTSABER: i32 = 0x00040000;
pub const CONTENTS_TELEPORTER: i32 = 0x00080000;
pub const CONTENTS_ITEM: i32 = 0x00100000;
pub const CONTENTS_NOSHOT: i32 = 0x00200000; // shots pass through me
pub const CONTENTS_DETAIL: i32 = 0x08000000; // brushes not used for the bsp
pub const CONTENTS_INSIDE: i32 = 0x10000000; // volume is considered to be inside (i.e. indoors)
pub const CONTENTS_TRANSLUCENT: i32 = 0x40000000; // don't consume surface fragments inside

// ============================================================
// Content masks
// ============================================================

pub const MASK_ALL: i32 = -1;
pub const MASK_SOLID: i32 = CONTENTS_SOLID | CONTENTS_TERRAIN;
pub const MASK_PLAYERSOLID: i32 =
    CONTENTS_SOLID | CONTENTS_PLAYERCLIP | CONTENTS_BODY | CONTENTS_TERRAIN;
pub const MASK_NPCSOLID: i32 =
    CONTENTS_SOLID | CONTENTS_MONSTERCLIP | CONTENTS_BODY | CONTENTS_TERRAIN;
pub const MASK_DEADSOLID: i32 = CONTENTS_SOLID | CONTENTS_PLAYERCLIP | CONTENTS_TERRAIN;
pub const MASK_WATER: i32 = CONTENTS_WATER | CONTENTS_LAVA | CONTENTS_SLIME;
pub const MASK_OPAQUE: i32 = CONTENTS_SOLID | CONTENTS_SLIME | CONTENTS_LAVA;
pub const MASK_SHOT: i32 = CONTENTS_SOLID | CONTENTS_BODY | CONTENTS_CORPSE | CONTENTS_TERRAIN;

/// True for the two masks damage-dealing traces use. Ownership
/// exclusions and `CONTENTS_NOSHOT` are special-cased for exactly these.
#[inline]
pub fn is_shot_mask(contentmask: i32) -> bool {
    contentmask == MASK_SHOT || contentmask == (MASK_SHOT | CONTENTS_LIGHTSABER)
}

// ============================================================
// Cvar flags
// ============================================================

pub const CVAR_CHEAT: i32 = 16; // can only be set when cheats are enabled

// ============================================================
// Plane
// ============================================================

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CPlane {
    pub normal: Vec3,
    pub dist: f32,
    pub plane_type: u8,
    pub signbits: u8,
}

// ============================================================
// Trace
// ============================================================

/// Result of sweeping a box (or capsule) from start to end.
///
/// `fraction` is 1.0 when nothing was hit. `entity_num` is
/// `ENTITYNUM_NONE` when nothing was hit, `ENTITYNUM_WORLD` when the
/// static world stopped the move, otherwise the blocking entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trace {
    pub allsolid: bool,   // if true, plane is not valid
    pub startsolid: bool, // if true, the initial point was in a solid area
    pub fraction: f32,    // time completed, 1.0 = didn't hit anything
    pub endpos: Vec3,     // final position
    pub plane: CPlane,    // surface normal at impact, transformed to world space
    pub surface_flags: i32,
    pub contents: i32, // contents on other side of surface hit
    pub entity_num: i32,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            allsolid: false,
            startsolid: false,
            fraction: 1.0,
            endpos: [0.0; 3],
            plane: CPlane::default(),
            surface_flags: 0,
            contents: 0,
            entity_num: ENTITYNUM_NONE,
        }
    }
}

// ============================================================
// MATHLIB -- Vector operations
// ============================================================

#[inline]
pub fn vector_subtract(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub fn vector_add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// veca + scale * vecb
pub fn vector_ma(veca: &Vec3, scale: f32, vecb: &Vec3) -> Vec3 {
    [
        veca[0] + scale * vecb[0],
        veca[1] + scale * vecb[1],
        veca[2] + scale * vecb[2],
    ]
}

pub fn vector_length(v: &Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

pub fn vector_distance(p1: &Vec3, p2: &Vec3) -> f32 {
    vector_length(&vector_subtract(p2, p1))
}

/// Radius of the sphere centered on the local origin that encloses the
/// box at any orientation.
pub fn radius_from_bounds(mins: &Vec3, maxs: &Vec3) -> f32 {
    let mut corner = [0.0f32; 3];
    for i in 0..3 {
        let a = mins[i].abs();
        let b = maxs[i].abs();
        corner[i] = if a > b { a } else { b };
    }
    vector_length(&corner)
}

/// Separating-axis overlap test for two axis-aligned boxes. Touching
/// faces count as overlapping.
#[inline]
pub fn bounds_intersect(mins1: &Vec3, maxs1: &Vec3, mins2: &Vec3, maxs2: &Vec3) -> bool {
    !(mins1[0] > maxs2[0]
        || mins1[1] > maxs2[1]
        || mins1[2] > maxs2[2]
        || maxs1[0] < mins2[0]
        || maxs1[1] < mins2[1]
        || maxs1[2] < mins2[2])
}
