// sv_ghoul2.rs -- skeletal mesh refinement of entity traces
//
// A bounding box hit on a ghoul2 model doesn't mean a polygon was struck.
// When the caller asks for it, the winning candidate is re-tested against
// the skinned mesh and the hit is either moved onto the mesh surface or
// rolled back.

use myjk_common::common::com_printf;
use myjk_common::cvar::cvar_variable_integer;
use myjk_common::q_shared::*;

use crate::sv_game::{EntityType, SharedEntity, EF_DEAD};

/// Opaque handle to a ghoul2 model instance owned by the renderer side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct G2Handle(pub u32);

bitflags::bitflags! {
    /// Extra trace flags passed through from the game module.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct G2TraceFlags: u32 {
        const DOGHOULTRACE = 0x10000000; // refine hits against the ghoul2 mesh
        const HITCORPSES   = 0x20000000; // allow refinement on EF_DEAD entities
        const GETSURFINDEX = 0x40000000; // stomp surface_flags with the hit surface index
        const THICK        = 0x80000000; // sweep radius is at least 1.0
    }
}

/// One contact reported by the mesh oracle. `entity_num == -1` marks an
/// empty slot; nothing follows the first empty slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct G2CollisionRecord {
    pub entity_num: i32,
    pub surface_index: i32,
    pub position: Vec3,
    pub normal: Vec3,
}

impl Default for G2CollisionRecord {
    fn default() -> Self {
        Self {
            entity_num: -1,
            surface_index: 0,
            position: [0.0; 3],
            normal: [0.0; 3],
        }
    }
}

pub type G2CollisionMap = [G2CollisionRecord; MAX_G2_COLLISIONS];

/// Everything the mesh oracle needs to place the model and sweep against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct G2TraceRequest {
    pub model: G2Handle,
    pub angles: Vec3,
    pub origin: Vec3,
    pub time: i32,
    pub entity_num: i32,
    pub start: Vec3,
    pub end: Vec3,
    pub scale: Vec3,
    pub use_lod: i32,
    pub radius: f32,
}

/// Mesh collision oracle.
pub trait G2Collision {
    fn collision_detect(&self, req: &G2TraceRequest, records: &mut G2CollisionMap);

    /// Same as `collision_detect`, but allowed to reuse the bone transforms
    /// computed for this model at this time.
    fn collision_detect_cache(&self, req: &G2TraceRequest, records: &mut G2CollisionMap) {
        self.collision_detect(req, records);
    }

    fn model_name(&self, model: G2Handle) -> String {
        format!("ghoul2 #{}", model.0)
    }
}

/// The moving volume, as seen by the refinement pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct G2Sweep {
    pub start: Vec3,
    pub end: Vec3,
    pub mins: Vec3,
    pub maxs: Vec3,
    pub trace_flags: G2TraceFlags,
    pub use_lod: i32,
    pub time: i32,
}

impl G2Sweep {
    /// Whether `touch`, having just become the recorded hit, gets a mesh pass.
    /// Dead entities are skipped unless the caller asked for corpses.
    pub fn wants_refinement(&self, touch: &SharedEntity) -> bool {
        self.trace_flags.contains(G2TraceFlags::DOGHOULTRACE)
            && touch.ghoul2.is_some()
            && (self.trace_flags.contains(G2TraceFlags::HITCORPSES)
                || touch.s.e_flags & EF_DEAD == 0)
    }

    fn radius(&self) -> f32 {
        let mut radius = 0.0f32;
        if self.mins[0] != 0.0 || self.maxs[0] != 0.0 {
            radius = (self.maxs[0] - self.mins[0]) / 2.0;
        }
        if self.trace_flags.contains(G2TraceFlags::THICK) && radius < 1.0 {
            radius = 1.0;
        }
        radius
    }

    fn request_for(&self, touch: &SharedEntity, model: G2Handle) -> G2TraceRequest {
        let mut angles = if (touch.s.number as usize) < MAX_CLIENTS {
            touch.s.apos_base
        } else {
            touch.current_angles
        };
        angles[ROLL] = 0.0;
        angles[PITCH] = 0.0;

        G2TraceRequest {
            model,
            angles,
            origin: touch.current_origin,
            time: self.time,
            entity_num: touch.s.number,
            start: self.start,
            end: self.end,
            scale: touch.model_scale,
            use_lod: self.use_lod,
            radius: self.radius(),
        }
    }

    /// Re-test the recorded hit on `touch` against its mesh. If a polygon
    /// was struck `trace` carries the mesh contact, otherwise it is
    /// restored to `old_trace`.
    pub fn refine(
        &self,
        trace: &mut Trace,
        old_trace: &Trace,
        touch: &SharedEntity,
        g2: &dyn G2Collision,
    ) {
        let Some(model) = touch.ghoul2 else {
            return;
        };
        let req = self.request_for(touch, model);

        if cvar_variable_integer("sv_showghoultraces") != 0 {
            com_printf(&format!(
                "Ghoul2 trace   lod={:1}   length={:6.0}   to {}\n",
                self.use_lod,
                vector_distance(&self.start, &self.end),
                g2.model_name(model)
            ));
        }

        let mut records: G2CollisionMap = [G2CollisionRecord::default(); MAX_G2_COLLISIONS];
        if cvar_variable_integer("com_optvehtrace") != 0
            && touch.s.e_type == EntityType::Npc
            && touch.vehicle
        {
            g2.collision_detect_cache(&req, &mut records);
        } else {
            g2.collision_detect(&req, &mut records);
        }

        let best = records
            .iter()
            .take_while(|r| r.entity_num != -1)
            .find(|r| r.entity_num == touch.s.number);

        match best {
            None => *trace = *old_trace,
            Some(hit) => {
                trace.endpos = hit.position;
                trace.plane.normal = hit.normal;
                if self.trace_flags.contains(G2TraceFlags::GETSURFINDEX)
                    && trace.entity_num == hit.entity_num
                {
                    trace.surface_flags = hit.surface_index;
                }
            }
        }
    }
}
