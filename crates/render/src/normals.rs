use glam::{Vec2, Vec3};
use planegrid_common::Vertex;

/// Derive per-vertex normals and tangents from positions, UVs and triangles.
///
/// Face normals are `(b - a) × (c - a)` for each triangle `(a, b, c)`,
/// summed unnormalized so larger faces weigh more. Tangents follow the
/// direction of increasing `uv0.x`; `tangent.w` carries the bitangent sign.
/// Triangles with an out-of-range index are skipped. Vertices touched by no
/// triangle keep a zero normal.
pub fn recompute_normals(vertices: &mut [Vertex], indices: &[u32]) {
    let n = vertices.len();
    let mut normals = vec![Vec3::ZERO; n];
    let mut tangents = vec![Vec3::ZERO; n];
    let mut bitangents = vec![Vec3::ZERO; n];

    for tri in indices.chunks_exact(3) {
        let [ia, ib, ic] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if ia >= n || ib >= n || ic >= n {
            continue;
        }
        let (a, b, c) = (
            vertices[ia].position(),
            vertices[ib].position(),
            vertices[ic].position(),
        );
        let e1 = b - a;
        let e2 = c - a;
        let face = e1.cross(e2);

        let (ta, tb, tc) = (vertices[ia].uv0(), vertices[ib].uv0(), vertices[ic].uv0());
        let (sdir, tdir) = uv_directions(e1, e2, tb - ta, tc - ta);

        for i in [ia, ib, ic] {
            normals[i] += face;
            tangents[i] += sdir;
            bitangents[i] += tdir;
        }
    }

    for (i, v) in vertices.iter_mut().enumerate() {
        let normal = normals[i].normalize_or_zero();
        // Gram-Schmidt against the normal
        let t = (tangents[i] - normal * normal.dot(tangents[i])).normalize_or_zero();
        let w = if normal.cross(t).dot(bitangents[i]) < 0.0 {
            -1.0
        } else {
            1.0
        };
        v.normal = normal.to_array();
        v.tangent = [t.x, t.y, t.z, w];
    }
}

fn uv_directions(e1: Vec3, e2: Vec3, d1: Vec2, d2: Vec2) -> (Vec3, Vec3) {
    let det = d1.x * d2.y - d2.x * d1.y;
    if det.abs() <= f32::EPSILON {
        return (Vec3::ZERO, Vec3::ZERO);
    }
    let r = 1.0 / det;
    let sdir = (e1 * d2.y - e2 * d1.y) * r;
    let tdir = (e2 * d1.x - e1 * d2.x) * r;
    (sdir, tdir)
}
