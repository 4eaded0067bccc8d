// sv_trace.rs -- movement clipping against the world and linked entities

use myjk_common::common::com_dprintf;
use myjk_common::q_shared::*;

use crate::error::{WorldError, WorldResult};
use crate::sv_game::SharedEntity;
use crate::sv_ghoul2::{G2Collision, G2Sweep, G2TraceFlags};
use crate::sv_world::{CollisionModel, SvWorldContext};

// ============================================================
// MoveClip -- working state for one trace
// ============================================================

#[derive(Debug, Clone, Copy)]
struct MoveClip {
    boxmins: Vec3, // enclose the test object along entire move
    boxmaxs: Vec3,
    mins: Vec3,
    maxs: Vec3,
    start: Vec3,
    end: Vec3,
    trace: Trace,
    pass_entity_num: i32,
    contentmask: i32,
    capsule: bool,
    sweep: G2Sweep,
}

/// Why a candidate was left out of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSkip {
    /// The entity the trace was told to pass through.
    PassEntity,
    /// Owned by the pass entity.
    OwnMissile,
    /// Shares an owner with the pass entity, and both share ownership.
    OwnerSibling,
    /// A shared missile fired by the pass entity's owner.
    MissileSibling,
    /// Has no contents the trace is looking for.
    ContentsMismatch,
    /// Marked unshootable and the trace is a shot.
    NoShot,
}

/// What the ownership rules need to know about the pass entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassInfo {
    pub num: i32,
    pub owner: Option<i32>,
    pub shared: bool,
}

impl PassInfo {
    pub fn new(ents: &[SharedEntity], pass_entity_num: i32) -> Self {
        let pass = usize::try_from(pass_entity_num).ok().and_then(|n| ents.get(n));
        let owner = pass
            .filter(|_| pass_entity_num != ENTITYNUM_NONE)
            .map(|e| e.owner_num)
            .filter(|&o| o != ENTITYNUM_NONE);
        Self {
            num: pass_entity_num,
            owner,
            shared: pass.map_or(true, |e| e.owner_shared()),
        }
    }
}

/// First rule that keeps `touch` out of the trace, or `None` if it must be
/// clipped against.
pub fn clip_skip_reason(num: usize, touch: &SharedEntity, pass: &PassInfo, contentmask: i32) -> Option<ClipSkip> {
    if pass.num != ENTITYNUM_NONE {
        if num as i32 == pass.num {
            return Some(ClipSkip::PassEntity); // don't clip against the pass entity
        }
        if touch.owner_num == pass.num && (touch.owner_shared() || !is_shot_mask(contentmask)) {
            // unshared missiles still stop shots from their owner
            return Some(ClipSkip::OwnMissile);
        }
        if let Some(owner) = pass.owner {
            if touch.owner_num == owner && touch.owner_shared() {
                if pass.shared {
                    return Some(ClipSkip::OwnerSibling);
                }
                if touch.is_missile() {
                    return Some(ClipSkip::MissileSibling);
                }
            }
        }
    }

    // if it doesn't have any brushes of a type we
    // are looking for, ignore it
    if contentmask & touch.contents == 0 {
        return Some(ClipSkip::ContentsMismatch);
    }

    if is_shot_mask(contentmask) && touch.contents > 0 && touch.contents & CONTENTS_NOSHOT != 0 {
        return Some(ClipSkip::NoShot);
    }

    None
}

/// Box enclosing the whole move, one unit larger on every side.
pub fn trace_bounds(start: &Vec3, mins: &Vec3, maxs: &Vec3, end: &Vec3) -> (Vec3, Vec3) {
    let mut boxmins = [0.0f32; 3];
    let mut boxmaxs = [0.0f32; 3];
    for i in 0..3 {
        if end[i] > start[i] {
            boxmins[i] = start[i] + mins[i] - 1.0;
            boxmaxs[i] = end[i] + maxs[i] + 1.0;
        } else {
            boxmins[i] = end[i] + mins[i] - 1.0;
            boxmaxs[i] = start[i] + maxs[i] + 1.0;
        }
    }
    (boxmins, boxmaxs)
}

impl SvWorldContext {
    // ================================================================
    // SV_ClipToEntity
    // ================================================================
    pub fn clip_to_entity(
        ents: &[SharedEntity],
        cm: &dyn CollisionModel,
        start: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        end: &Vec3,
        entity_num: i32,
        contentmask: i32,
        capsule: bool,
    ) -> WorldResult<Trace> {
        let touch = usize::try_from(entity_num)
            .ok()
            .and_then(|n| ents.get(n))
            .ok_or(WorldError::BadEntityNumber(entity_num))?;

        if contentmask & touch.contents == 0 {
            return Ok(Trace::default());
        }

        // might intersect, so do an exact clip
        let handle = Self::clip_handle_for_entity(touch, cm)?;
        let angles = if touch.bmodel { touch.current_angles } else { vec3_origin }; // boxes don't rotate

        let mut trace = cm.transformed_box_trace(
            start,
            end,
            mins,
            maxs,
            handle,
            contentmask,
            &touch.current_origin,
            &angles,
            capsule,
        );
        if trace.fraction < 1.0 {
            trace.entity_num = touch.s.number;
        }
        Ok(trace)
    }

    // ================================================================
    // SV_ClipMoveToEntities
    // ================================================================
    fn clip_move_to_entities(
        &self,
        clip: &mut MoveClip,
        ents: &[SharedEntity],
        cm: &dyn CollisionModel,
        g2: Option<&dyn G2Collision>,
    ) {
        let touchlist = self.area_entities(&clip.boxmins, &clip.boxmaxs, ents, MAX_GENTITIES);
        let pass = PassInfo::new(ents, clip.pass_entity_num);
        let mut old_trace = Trace::default();

        for &num in &touchlist.list {
            if clip.trace.allsolid {
                return;
            }
            let touch = &ents[num];

            if clip_skip_reason(num, touch, &pass, clip.contentmask).is_some() {
                continue;
            }

            let handle = match Self::clip_handle_for_entity(touch, cm) {
                Ok(h) => h,
                Err(e) => {
                    com_dprintf(&format!("SV_ClipMoveToEntities: {}\n", e));
                    continue;
                }
            };
            let angles = if touch.bmodel { touch.current_angles } else { vec3_origin };

            let mut trace = cm.transformed_box_trace(
                &clip.start,
                &clip.end,
                &clip.mins,
                &clip.maxs,
                handle,
                clip.contentmask,
                &touch.current_origin,
                &angles,
                clip.capsule,
            );

            if clip.sweep.trace_flags.contains(G2TraceFlags::DOGHOULTRACE) {
                // kept in case the mesh pass finds the box hit was empty space
                old_trace = clip.trace;
            }

            let number = touch.s.number;
            let mut hit = false;
            if trace.allsolid {
                clip.trace.allsolid = true;
                clip.trace.entity_num = number;
                hit = true;
            } else if trace.startsolid {
                // report the entity even when the move starts inside it
                clip.trace.startsolid = true;
                clip.trace.entity_num = number;
                hit = true;
            }

            if trace.fraction < clip.trace.fraction {
                // make sure we keep a startsolid from a previous trace
                let old_start = clip.trace.startsolid;
                trace.entity_num = number;
                clip.trace = trace;
                clip.trace.startsolid |= old_start;
                hit = true;
            }

            if hit && clip.sweep.wants_refinement(touch) {
                if let Some(g2) = g2 {
                    clip.sweep.refine(&mut clip.trace, &old_trace, touch, g2);
                }
            }
        }
    }

    // ================================================================
    // SV_Trace
    //
    // Moves the given mins/maxs volume through the world from start to end.
    // pass_entity_num and entities owned by pass_entity_num are explicitly
    // not checked.
    // ================================================================
    pub fn trace(
        &self,
        ents: &[SharedEntity],
        cm: &dyn CollisionModel,
        g2: Option<&dyn G2Collision>,
        start: &Vec3,
        mins: Option<&Vec3>,
        maxs: Option<&Vec3>,
        end: &Vec3,
        pass_entity_num: i32,
        contentmask: i32,
        capsule: bool,
        trace_flags: G2TraceFlags,
        use_lod: i32,
    ) -> Trace {
        let mins = mins.copied().unwrap_or(vec3_origin);
        let maxs = maxs.copied().unwrap_or(vec3_origin);

        // clip to world
        let mut world = cm.box_trace(start, end, &mins, &maxs, 0, contentmask, capsule);
        world.entity_num = if world.fraction != 1.0 { ENTITYNUM_WORLD } else { ENTITYNUM_NONE };
        if world.fraction == 0.0 {
            return world; // blocked immediately by the world
        }

        // create the bounding box of the entire move
        let (boxmins, boxmaxs) = trace_bounds(start, &mins, &maxs, end);

        let mut clip = MoveClip {
            boxmins,
            boxmaxs,
            mins,
            maxs,
            start: *start,
            end: *end,
            trace: world,
            pass_entity_num,
            contentmask,
            capsule,
            sweep: G2Sweep {
                start: *start,
                end: *end,
                mins,
                maxs,
                trace_flags,
                use_lod,
                time: self.time,
            },
        };

        // clip to other solid entities
        self.clip_move_to_entities(&mut clip, ents, cm, g2);

        clip.trace
    }
}
