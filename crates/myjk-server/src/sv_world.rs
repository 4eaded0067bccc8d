// sv_world.rs -- world query functions
//
// Entity area checking: spatial partitioning via world sectors,
// linking/unlinking entities, box queries and point contents.
// Movement clipping lives in sv_trace.rs.

use arrayvec::ArrayVec;
use parking_lot::Mutex;

use myjk_common::common::{com_dprintf, com_printf};
use myjk_common::cvar::cvar_get;
use myjk_common::q_shared::*;

use crate::error::{WorldError, WorldResult};
use crate::server::ServerState;
use crate::sv_game::{SharedEntity, SvFlags, SOLID_BMODEL};

static SV_WORLD_CTX: Mutex<Option<SvWorldContext>> = Mutex::new(None);

/// Access the global SvWorldContext via a closure.
pub fn with_sv_world_ctx<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut SvWorldContext) -> R,
{
    let mut guard = SV_WORLD_CTX.lock();
    guard.as_mut().map(f)
}

/// Initialize the global world context and register the cvars the world
/// queries read.
pub fn init_sv_world_ctx() {
    cvar_get("developer", "0", 0);
    cvar_get("sv_showghoultraces", "0", CVAR_CHEAT);
    cvar_get("com_optvehtrace", "0", 0);
    *SV_WORLD_CTX.lock() = Some(SvWorldContext::new());
}

// ===============================================================================
// ENTITY CHECKING
//
// To avoid linearly searching through lists of entities during environment
// testing, the world is carved up with an evenly spaced, axially aligned bsp
// tree. Entities are kept in chains either at the final leafs, or at the first
// node that splits them, which prevents having to deal with multiple fragments
// of a single entity.
// ===============================================================================

pub const AREA_DEPTH: usize = 4;
pub const AREA_NODES: usize = 64;
pub const MAX_TOTAL_ENT_LEAFS: usize = 128;

/// Collision model handle: 0 is the world, inline models and temporary
/// boxes get whatever the collision model hands out.
pub type ClipHandle = i32;

// ============================================================
// Collision model callbacks trait
// ============================================================

/// Trait abstracting the collision model (CM) functions that the world
/// queries need. Allows testing and decoupling from the actual CM
/// implementation.
pub trait CollisionModel {
    /// Handle for inline model `index` (0 is the world), if the map has it.
    fn inline_model(&self, index: i32) -> Option<ClipHandle>;
    fn model_bounds(&self, model: ClipHandle) -> (Vec3, Vec3);
    /// A temporary box (or capsule) model valid until the next call.
    fn temp_box_model(&self, mins: &Vec3, maxs: &Vec3, capsule: bool) -> ClipHandle;

    /// Fills `list` with the leafs touching the box and returns how many
    /// were stored. `last_leaf` receives the last leaf visited, even one
    /// that did not fit in `list`.
    fn box_leafnums(&self, mins: &Vec3, maxs: &Vec3, list: &mut [i32], last_leaf: &mut i32) -> usize;
    fn leaf_cluster(&self, leafnum: i32) -> i32;
    fn leaf_area(&self, leafnum: i32) -> i32;

    fn point_contents(&self, p: &Vec3, model: ClipHandle) -> i32;
    fn transformed_point_contents(&self, p: &Vec3, model: ClipHandle, origin: &Vec3, angles: &Vec3) -> i32;

    fn box_trace(
        &self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
        capsule: bool,
    ) -> Trace;
    fn transformed_box_trace(
        &self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
        origin: &Vec3,
        angles: &Vec3,
        capsule: bool,
    ) -> Trace;
}

// ============================================================
// World sector (spatial partitioning BSP for entities)
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct WorldSector {
    pub axis: Option<usize>, // None = leaf node
    pub dist: f32,
    pub children: [usize; 2], // indices into SvWorldContext::sectors
    pub entities: Option<usize>, // head of the chain, entity number
}

impl Default for WorldSector {
    fn default() -> Self {
        Self {
            axis: None,
            dist: 0.0,
            children: [usize::MAX; 2],
            entities: None,
        }
    }
}

impl WorldSector {
    pub fn is_leaf(&self) -> bool {
        self.axis.is_none()
    }
}

// ============================================================
// SvEntity -- per-entity link state private to the server
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct SvEntity {
    pub world_sector: Option<usize>,
    pub next_in_sector: Option<usize>,

    pub clusternums: ArrayVec<i32, MAX_ENT_CLUSTERS>,
    /// Cluster of the last leaf when the explicit list overflowed.
    pub last_cluster: Option<i32>,
    pub areanum: i32,  // -1 = none
    pub areanum2: i32, // -1 = none
}

impl Default for SvEntity {
    fn default() -> Self {
        Self {
            world_sector: None,
            next_in_sector: None,
            clusternums: ArrayVec::new(),
            last_cluster: None,
            areanum: -1,
            areanum2: -1,
        }
    }
}

impl SvEntity {
    fn clear_pvs(&mut self) {
        self.clusternums.clear();
        self.last_cluster = None;
        self.areanum = -1;
        self.areanum2 = -1;
    }
}

/// What `unlink_entity` found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    Unlinked,
    NotLinked,
    /// The entity claimed a sector but wasn't in its chain. The link state
    /// is cleared anyway.
    MissingFromSector,
}

/// Result of an area query. `truncated` is set when the cap was hit and
/// some touching entities were left out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AreaEntities {
    pub list: Vec<usize>,
    pub truncated: bool,
}

// ============================================================
// Size encoding for client prediction
// ============================================================

/// Pack a bbox into `entity_state.solid`: x/y are assumed symmetric, z
/// is not, and z maxs can be negative.
pub fn encode_solid(ent: &SharedEntity) -> i32 {
    if ent.bmodel {
        return SOLID_BMODEL; // a solid_box will never create this value
    }
    if ent.contents & (CONTENTS_SOLID | CONTENTS_BODY) == 0 {
        return 0;
    }

    let i = (ent.maxs[0] as i32).clamp(1, 255);
    let j = ((-ent.mins[2]) as i32).clamp(1, 255);
    let k = ((ent.maxs[2] + 32.0) as i32).clamp(1, 255);

    let solid = (k << 16) | (j << 8) | i;
    if solid == SOLID_BMODEL {
        // would decode as a brush model on the client
        return (k << 16) | (j << 8) | (i - 1);
    }
    solid
}

// ============================================================
// SvWorldContext -- the sector tree and all link state
// ============================================================

#[derive(Debug)]
pub struct SvWorldContext {
    pub sectors: Vec<WorldSector>,
    pub num_sectors: usize,
    pub sv_entities: Vec<SvEntity>,
    /// Server time in msec, stamped by the frame driver. Handed to the
    /// ghoul2 oracle so it animates models to the right frame.
    pub time: i32,
}

impl Default for SvWorldContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SvWorldContext {
    pub fn new() -> Self {
        Self {
            sectors: Vec::new(),
            num_sectors: 0,
            sv_entities: vec![SvEntity::default(); MAX_GENTITIES],
            time: 0,
        }
    }

    pub fn sv_entity(&self, num: usize) -> Option<&SvEntity> {
        self.sv_entities.get(num)
    }

    // ================================================================
    // SV_CreateworldSector
    //
    // Builds a uniformly subdivided tree for the given world size.
    // Returns the index of the created node.
    // ================================================================
    fn create_world_sector(&mut self, depth: usize, mins: &Vec3, maxs: &Vec3) -> usize {
        let idx = self.num_sectors;
        self.num_sectors += 1;
        self.sectors[idx] = WorldSector::default();

        if depth == AREA_DEPTH {
            return idx;
        }

        let size = vector_subtract(maxs, mins);
        let axis = if size[0] > size[1] { 0 } else { 1 };
        let dist = 0.5 * (maxs[axis] + mins[axis]);

        let mut maxs1 = *maxs;
        let mut mins2 = *mins;
        maxs1[axis] = dist;
        mins2[axis] = dist;

        let child0 = self.create_world_sector(depth + 1, &mins2, maxs);
        let child1 = self.create_world_sector(depth + 1, mins, &maxs1);

        let sector = &mut self.sectors[idx];
        sector.axis = Some(axis);
        sector.dist = dist;
        sector.children = [child0, child1];
        idx
    }

    /// Rebuild the sector tree over the given bounds and drop every link.
    pub fn create_world_sectors(&mut self, world_mins: &Vec3, world_maxs: &Vec3) {
        self.sectors.clear();
        self.sectors.resize(AREA_NODES, WorldSector::default());
        self.num_sectors = 0;
        for sv in self.sv_entities.iter_mut() {
            *sv = SvEntity::default();
        }
        self.create_world_sector(0, world_mins, world_maxs);
    }

    // ================================================================
    // SV_ClearWorld
    // ================================================================
    pub fn clear_world(&mut self, cm: &dyn CollisionModel) {
        // get world map bounds
        let (mins, maxs) = cm.model_bounds(cm.inline_model(0).unwrap_or(0));
        self.create_world_sectors(&mins, &maxs);
    }

    // ================================================================
    // SV_SectorList_f
    // ================================================================
    pub fn sector_list(&self) -> Vec<usize> {
        let mut counts = vec![0usize; AREA_NODES];
        for (i, count) in counts.iter_mut().enumerate() {
            if let Some(sector) = self.sectors.get(i) {
                *count = self.chain(sector.entities).count();
            }
            com_printf(&format!("sector {}: {} entities\n", i, count));
        }
        counts
    }

    /// Walk a sector chain starting at `head`.
    pub fn chain(&self, head: Option<usize>) -> impl Iterator<Item = usize> + '_ {
        std::iter::successors(head, move |&num| {
            self.sv_entities.get(num).and_then(|sv| sv.next_in_sector)
        })
    }

    // ================================================================
    // SV_UnlinkEntity
    // ================================================================
    pub fn unlink_entity(&mut self, ents: &mut [SharedEntity], num: usize) -> UnlinkOutcome {
        if let Some(ent) = ents.get_mut(num) {
            ent.linked = false;
        }

        let Some(sv) = self.sv_entities.get_mut(num) else {
            com_printf(&format!("WARNING: SV_UnlinkEntity: bad entity number {}\n", num));
            return UnlinkOutcome::NotLinked;
        };
        let Some(ws) = sv.world_sector.take() else {
            com_dprintf(&format!("SV_UnlinkEntity: entity {} not linked\n", num));
            return UnlinkOutcome::NotLinked; // not linked in anywhere
        };
        let next = sv.next_in_sector.take();
        sv.clear_pvs();

        let sector = &mut self.sectors[ws];
        if sector.entities == Some(num) {
            sector.entities = next;
            return UnlinkOutcome::Unlinked;
        }

        let mut scan = sector.entities;
        while let Some(s) = scan {
            let prev = &mut self.sv_entities[s];
            if prev.next_in_sector == Some(num) {
                prev.next_in_sector = next;
                return UnlinkOutcome::Unlinked;
            }
            scan = prev.next_in_sector;
        }

        com_printf("WARNING: SV_UnlinkEntity: not found in worldSector\n");
        UnlinkOutcome::MissingFromSector
    }

    // ================================================================
    // SV_LinkEntity
    // ================================================================
    pub fn link_entity(
        &mut self,
        ents: &mut [SharedEntity],
        num: usize,
        server_state: ServerState,
        cm: &dyn CollisionModel,
    ) {
        if num >= ents.len() || num >= self.sv_entities.len() {
            com_printf(&format!("WARNING: SV_LinkEntity: bad entity number {}\n", num));
            return;
        }
        if self.num_sectors == 0 {
            com_dprintf("SV_LinkEntity: world not cleared\n");
            return;
        }

        if self.sv_entities[num].world_sector.is_some() {
            self.unlink_entity(ents, num); // unlink from old position
        }

        let ent = &mut ents[num];

        // encode the size into the entity_state for client prediction
        ent.s.solid = encode_solid(ent);

        // set the abs box
        let origin = ent.current_origin;
        let angles = ent.current_angles;
        if ent.bmodel && (angles[0] != 0.0 || angles[1] != 0.0 || angles[2] != 0.0) {
            // expand for rotation
            let max = radius_from_bounds(&ent.mins, &ent.maxs);
            for i in 0..3 {
                ent.absmin[i] = origin[i] - max;
                ent.absmax[i] = origin[i] + max;
            }
        } else {
            // normal
            ent.absmin = vector_add(&origin, &ent.mins);
            ent.absmax = vector_add(&origin, &ent.maxs);
        }

        // because movement is clipped an epsilon away from an actual edge,
        // we must fully check even when bounding boxes don't quite touch
        for i in 0..3 {
            ent.absmin[i] -= 1.0;
            ent.absmax[i] += 1.0;
        }

        let absmin = ent.absmin;
        let absmax = ent.absmax;

        // link to PVS leafs
        let sv = &mut self.sv_entities[num];
        sv.clear_pvs();

        // get all leafs, including solids
        let mut leafs = [0i32; MAX_TOTAL_ENT_LEAFS];
        let mut last_leaf = 0i32;
        let num_leafs = cm
            .box_leafnums(&absmin, &absmax, &mut leafs, &mut last_leaf)
            .min(MAX_TOTAL_ENT_LEAFS);

        // if none of the leafs were inside the map, the
        // entity is outside the world and can be considered unlinked
        if num_leafs == 0 {
            return;
        }
        let leafs = &leafs[..num_leafs];

        // set areas, even from clusters that don't fit in the entity array
        for &leaf in leafs {
            let area = cm.leaf_area(leaf);
            if area == -1 || area == sv.areanum || area == sv.areanum2 {
                continue;
            }
            if sv.areanum == -1 {
                sv.areanum = area;
            } else if sv.areanum2 == -1 {
                sv.areanum2 = area;
            } else if server_state == ServerState::Loading {
                // doors may legally straddle two areas,
                // but nothing should ever need more than that
                com_dprintf(&format!(
                    "Object {} touching 3 areas at {} {} {}\n",
                    num, absmin[0], absmin[1], absmin[2]
                ));
            }
        }

        // store as many explicit clusters as we can
        let mut overflowed = false;
        for &leaf in leafs {
            let cluster = cm.leaf_cluster(leaf);
            if cluster == -1 {
                continue;
            }
            sv.clusternums.push(cluster);
            if sv.clusternums.is_full() {
                overflowed = true;
                break;
            }
        }

        // store off a last cluster if we need to
        if overflowed {
            sv.last_cluster = Some(cm.leaf_cluster(last_leaf));
        }

        let ent = &mut ents[num];
        ent.linkcount += 1;

        // find the first world sector node that the ent's box crosses
        let node = self.find_sector(&absmin, &absmax);

        // link it in
        let sv = &mut self.sv_entities[num];
        sv.world_sector = Some(node);
        sv.next_in_sector = self.sectors[node].entities;
        self.sectors[node].entities = Some(num);

        ents[num].linked = true;
    }

    /// The shallowest sector whose split the box straddles, or the leaf
    /// it falls into.
    pub fn find_sector(&self, absmin: &Vec3, absmax: &Vec3) -> usize {
        let mut node = 0;
        loop {
            let sector = &self.sectors[node];
            let Some(axis) = sector.axis else {
                break;
            };
            if absmin[axis] > sector.dist {
                node = sector.children[0];
            } else if absmax[axis] < sector.dist {
                node = sector.children[1];
            } else {
                break; // crosses the node
            }
        }
        node
    }

    // ================================================================
    // SV_AreaEntities_r
    // ================================================================
    fn area_entities_r(
        &self,
        node: usize,
        ents: &[SharedEntity],
        mins: &Vec3,
        maxs: &Vec3,
        maxcount: usize,
        out: &mut AreaEntities,
    ) {
        let sector = &self.sectors[node];

        for num in self.chain(sector.entities) {
            let Some(check) = ents.get(num) else {
                continue;
            };
            if !bounds_intersect(&check.absmin, &check.absmax, mins, maxs) {
                continue;
            }

            if out.list.len() == maxcount {
                com_dprintf("SV_AreaEntities: MAXCOUNT\n");
                out.truncated = true;
                return;
            }
            out.list.push(num);
        }

        let Some(axis) = sector.axis else {
            return; // terminal node
        };

        // recurse down both sides
        if maxs[axis] > sector.dist {
            self.area_entities_r(sector.children[0], ents, mins, maxs, maxcount, out);
            if out.truncated {
                return;
            }
        }
        if mins[axis] < sector.dist {
            self.area_entities_r(sector.children[1], ents, mins, maxs, maxcount, out);
        }
    }

    // ================================================================
    // SV_AreaEntities
    //
    // All entities whose absmin / absmax intersect the given bounds. This
    // does NOT mean that they actually touch in the case of bmodels.
    // ================================================================
    pub fn area_entities(&self, mins: &Vec3, maxs: &Vec3, ents: &[SharedEntity], maxcount: usize) -> AreaEntities {
        let mut out = AreaEntities::default();
        if self.num_sectors > 0 {
            self.area_entities_r(0, ents, mins, maxs, maxcount, &mut out);
        }
        out
    }

    // ================================================================
    // SV_ClipHandleForEntity
    //
    // Returns a handle that can be used for testing or clipping to a
    // given entity. If the entity is a bsp model, its inline model is
    // used, otherwise a temporary box or capsule is built.
    // ================================================================
    pub fn clip_handle_for_entity(ent: &SharedEntity, cm: &dyn CollisionModel) -> WorldResult<ClipHandle> {
        if ent.bmodel {
            // explicit hulls in the BSP model
            return cm.inline_model(ent.s.modelindex).ok_or(WorldError::MissingInlineModel {
                entity: ent.s.number,
                modelindex: ent.s.modelindex,
            });
        }
        let capsule = ent.svflags.contains(SvFlags::CAPSULE);
        Ok(cm.temp_box_model(&ent.mins, &ent.maxs, capsule))
    }

    // ================================================================
    // SV_PointContents
    // ================================================================
    pub fn point_contents(
        &self,
        p: &Vec3,
        pass_entity_num: i32,
        ents: &[SharedEntity],
        cm: &dyn CollisionModel,
    ) -> i32 {
        // get base contents from world
        let mut contents = cm.point_contents(p, 0);

        // or in contents from all the other entities
        let touch = self.area_entities(p, p, ents, MAX_GENTITIES);

        for &num in &touch.list {
            if num as i32 == pass_entity_num {
                continue;
            }
            let hit = &ents[num];

            // might intersect, so do an exact clip
            let handle = match Self::clip_handle_for_entity(hit, cm) {
                Ok(h) => h,
                Err(e) => {
                    com_dprintf(&format!("SV_PointContents: {}\n", e));
                    continue;
                }
            };

            contents |= cm.transformed_point_contents(p, handle, &hit.current_origin, &hit.current_angles);
        }

        contents
    }
}
