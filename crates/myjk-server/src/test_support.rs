// test_support.rs -- box-world collision model shared by the unit tests
//
// Leaves are a uniform XY grid over the world bounds. Every model is a set
// of axis-aligned boxes, and traces are real slab sweeps, so fractions,
// startsolid and allsolid behave like the real thing for boxes.

use std::cell::{Cell, RefCell};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::Level;

use myjk_common::q_shared::*;

use crate::sv_world::{ClipHandle, CollisionModel};

pub(crate) const TEMP_BOX_BASE: ClipHandle = 10_000;

#[derive(Debug, Clone, Copy)]
pub(crate) struct Brush {
    pub mins: Vec3,
    pub maxs: Vec3,
    pub contents: i32,
}

impl Brush {
    pub fn solid(mins: Vec3, maxs: Vec3) -> Self {
        Self { mins, maxs, contents: CONTENTS_SOLID }
    }
}

pub(crate) struct BoxWorldCM {
    pub world_mins: Vec3,
    pub world_maxs: Vec3,
    pub grid: usize,
    pub leaf_clusters: Vec<i32>,
    pub leaf_areas: Vec<i32>,
    pub world_brushes: Vec<Brush>,
    /// Inline model `i` lives at index `i - 1`.
    pub inline_models: Vec<Vec<Brush>>,
    temp_boxes: RefCell<Vec<(Vec3, Vec3, bool)>>,
    pub entity_traces: Cell<usize>,
    /// Capsule flag of every entity trace, in call order.
    pub entity_trace_capsules: RefCell<Vec<bool>>,
}

impl BoxWorldCM {
    /// An empty 8192-unit cube split into a 4x4 leaf grid, one cluster per
    /// leaf and everything in area 0.
    pub fn open() -> Self {
        let grid = 4;
        Self {
            world_mins: [-4096.0; 3],
            world_maxs: [4096.0; 3],
            grid,
            leaf_clusters: (0..(grid * grid) as i32).collect(),
            leaf_areas: vec![0; grid * grid],
            world_brushes: Vec::new(),
            inline_models: Vec::new(),
            temp_boxes: RefCell::new(Vec::new()),
            entity_traces: Cell::new(0),
            entity_trace_capsules: RefCell::new(Vec::new()),
        }
    }

    pub fn with_grid(mut self, grid: usize) -> Self {
        self.grid = grid;
        self.leaf_clusters = (0..(grid * grid) as i32).collect();
        self.leaf_areas = vec![0; grid * grid];
        self
    }

    pub fn last_temp_box(&self) -> Option<(Vec3, Vec3, bool)> {
        self.temp_boxes.borrow().last().copied()
    }

    fn brushes(&self, model: ClipHandle) -> Vec<Brush> {
        if model == 0 {
            return self.world_brushes.clone();
        }
        if model >= TEMP_BOX_BASE {
            let boxes = self.temp_boxes.borrow();
            return boxes
                .get((model - TEMP_BOX_BASE) as usize)
                .map(|&(mins, maxs, _)| vec![Brush { mins, maxs, contents: CONTENTS_BODY }])
                .unwrap_or_default();
        }
        self.inline_models
            .get(model as usize - 1)
            .cloned()
            .unwrap_or_default()
    }

    fn leaf_range(&self, lo: f32, hi: f32, axis: usize) -> (usize, usize) {
        let size = (self.world_maxs[axis] - self.world_mins[axis]) / self.grid as f32;
        let cell = |v: f32| {
            let c = ((v - self.world_mins[axis]) / size).floor() as i64;
            c.clamp(0, self.grid as i64 - 1) as usize
        };
        (cell(lo), cell(hi))
    }
}

fn strictly_inside(p: &Vec3, emin: &Vec3, emax: &Vec3) -> bool {
    (0..3).all(|i| p[i] > emin[i] && p[i] < emax[i])
}

/// Sweep the box `mins`/`maxs` from `start` to `end` against one brush.
/// `None` means the brush doesn't affect the move.
pub(crate) fn sweep_brush(start: &Vec3, end: &Vec3, mins: &Vec3, maxs: &Vec3, b: &Brush) -> Option<Trace> {
    let emin = vector_subtract(&b.mins, maxs);
    let emax = vector_subtract(&b.maxs, mins);

    if strictly_inside(start, &emin, &emax) {
        let mut t = Trace {
            startsolid: true,
            contents: b.contents,
            endpos: *end,
            ..Trace::default()
        };
        if strictly_inside(end, &emin, &emax) {
            t.allsolid = true;
            t.fraction = 0.0;
            t.endpos = *start;
        }
        return Some(t);
    }

    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    let mut hit_axis = 0;
    let mut sign = 0.0;
    for i in 0..3 {
        let d = end[i] - start[i];
        if d == 0.0 {
            if start[i] <= emin[i] || start[i] >= emax[i] {
                return None;
            }
            continue;
        }
        let t1 = (emin[i] - start[i]) / d;
        let t2 = (emax[i] - start[i]) / d;
        let (near, far, s) = if t1 < t2 { (t1, t2, -1.0) } else { (t2, t1, 1.0) };
        if near > t_enter {
            t_enter = near;
            hit_axis = i;
            sign = s;
        }
        if far < t_exit {
            t_exit = far;
        }
    }

    if t_enter > t_exit || t_enter < 0.0 || t_enter > 1.0 {
        return None;
    }

    let mut t = Trace {
        fraction: t_enter,
        endpos: vector_ma(start, t_enter, &vector_subtract(end, start)),
        contents: b.contents,
        ..Trace::default()
    };
    t.plane.normal[hit_axis] = sign;
    Some(t)
}

// ============================================================
// Console capture
// ============================================================

#[derive(Clone, Default)]
struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CaptureWriter {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with a subscriber installed on this thread and return every
/// console line it printed, developer output included.
pub(crate) fn capture_console(f: impl FnOnce()) -> String {
    let writer = CaptureWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .without_time()
        .with_writer(writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = writer.0.lock().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

impl CollisionModel for BoxWorldCM {
    fn inline_model(&self, index: i32) -> Option<ClipHandle> {
        if index == 0 || (index > 0 && index as usize <= self.inline_models.len()) {
            Some(index)
        } else {
            None
        }
    }

    fn model_bounds(&self, model: ClipHandle) -> (Vec3, Vec3) {
        if model == 0 {
            return (self.world_mins, self.world_maxs);
        }
        let brushes = self.brushes(model);
        let mut mins = [f32::MAX; 3];
        let mut maxs = [f32::MIN; 3];
        for b in &brushes {
            for i in 0..3 {
                mins[i] = mins[i].min(b.mins[i]);
                maxs[i] = maxs[i].max(b.maxs[i]);
            }
        }
        (mins, maxs)
    }

    fn temp_box_model(&self, mins: &Vec3, maxs: &Vec3, capsule: bool) -> ClipHandle {
        let mut boxes = self.temp_boxes.borrow_mut();
        boxes.push((*mins, *maxs, capsule));
        TEMP_BOX_BASE + boxes.len() as ClipHandle - 1
    }

    fn box_leafnums(&self, mins: &Vec3, maxs: &Vec3, list: &mut [i32], last_leaf: &mut i32) -> usize {
        if !bounds_intersect(mins, maxs, &self.world_mins, &self.world_maxs) {
            return 0;
        }
        let (x0, x1) = self.leaf_range(mins[0], maxs[0], 0);
        let (y0, y1) = self.leaf_range(mins[1], maxs[1], 1);
        let mut count = 0;
        for y in y0..=y1 {
            for x in x0..=x1 {
                let leaf = (y * self.grid + x) as i32;
                *last_leaf = leaf;
                if count < list.len() {
                    list[count] = leaf;
                    count += 1;
                }
            }
        }
        count
    }

    fn leaf_cluster(&self, leafnum: i32) -> i32 {
        self.leaf_clusters.get(leafnum as usize).copied().unwrap_or(-1)
    }

    fn leaf_area(&self, leafnum: i32) -> i32 {
        self.leaf_areas.get(leafnum as usize).copied().unwrap_or(-1)
    }

    fn point_contents(&self, p: &Vec3, model: ClipHandle) -> i32 {
        self.brushes(model)
            .iter()
            .filter(|b| (0..3).all(|i| p[i] >= b.mins[i] && p[i] <= b.maxs[i]))
            .fold(0, |acc, b| acc | b.contents)
    }

    fn transformed_point_contents(&self, p: &Vec3, model: ClipHandle, origin: &Vec3, _angles: &Vec3) -> i32 {
        self.point_contents(&vector_subtract(p, origin), model)
    }

    fn box_trace(
        &self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
        _capsule: bool,
    ) -> Trace {
        let mut result = Trace { endpos: *end, ..Trace::default() };
        for b in self.brushes(model) {
            if model < TEMP_BOX_BASE && b.contents & brushmask == 0 {
                continue;
            }
            let Some(t) = sweep_brush(start, end, mins, maxs, &b) else {
                continue;
            };
            result.startsolid |= t.startsolid;
            result.allsolid |= t.allsolid;
            if t.fraction < result.fraction {
                result.fraction = t.fraction;
                result.endpos = t.endpos;
                result.plane = t.plane;
                result.contents = t.contents;
            }
        }
        if result.allsolid {
            result.fraction = 0.0;
            result.endpos = *start;
        }
        result
    }

    fn transformed_box_trace(
        &self,
        start: &Vec3,
        end: &Vec3,
        mins: &Vec3,
        maxs: &Vec3,
        model: ClipHandle,
        brushmask: i32,
        origin: &Vec3,
        _angles: &Vec3,
        capsule: bool,
    ) -> Trace {
        self.entity_traces.set(self.entity_traces.get() + 1);
        self.entity_trace_capsules.borrow_mut().push(capsule);
        let local_start = vector_subtract(start, origin);
        let local_end = vector_subtract(end, origin);
        let mut t = self.box_trace(&local_start, &local_end, mins, maxs, model, brushmask, capsule);
        t.endpos = vector_ma(start, t.fraction, &vector_subtract(end, start));
        t
    }
}
