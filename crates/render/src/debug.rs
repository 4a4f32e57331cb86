use planegrid_common::{Bounds, MeshError, Vertex};

use crate::sink::{MeshSink, SubmeshDescriptor};

/// Records every sink call as a human-readable line.
///
/// Useful for CLI output, logging, and checking publish order in tests.
#[derive(Debug, Default)]
pub struct DebugTextSink {
    lines: Vec<String>,
}

impl DebugTextSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Drain the recorded lines.
    pub fn take_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// All recorded lines joined with newlines.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl MeshSink for DebugTextSink {
    fn set_vertex_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        self.lines.push(format!("vertex_params count={count}"));
        Ok(())
    }

    fn set_index_buffer_params(&mut self, count: usize) -> Result<(), MeshError> {
        self.lines.push(format!("index_params count={count}"));
        Ok(())
    }

    fn upload_vertex_buffer(
        &mut self,
        vertices: &[Vertex],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        let first = vertices.first().map(|v| v.position).unwrap_or_default();
        self.lines.push(format!(
            "upload_vertices offset={offset} count={count} first=({:.2}, {:.2}, {:.2})",
            first[0], first[1], first[2]
        ));
        Ok(())
    }

    fn upload_index_buffer(
        &mut self,
        _indices: &[u32],
        offset: usize,
        count: usize,
    ) -> Result<(), MeshError> {
        self.lines
            .push(format!("upload_indices offset={offset} count={count}"));
        Ok(())
    }

    fn define_submesh(&mut self, submesh: SubmeshDescriptor) -> Result<(), MeshError> {
        self.lines.push(format!(
            "submesh start={} count={} topology={:?}",
            submesh.index_start, submesh.index_count, submesh.topology
        ));
        Ok(())
    }

    fn set_bounds(&mut self, bounds: Bounds) -> Result<(), MeshError> {
        self.lines.push(format!(
            "bounds min=({:.2}, {:.2}, {:.2}) max=({:.2}, {:.2}, {:.2})",
            bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
        ));
        Ok(())
    }

    fn recompute_normals(&mut self) -> Result<(), MeshError> {
        self.lines.push("recompute_normals".into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn records_calls_in_order() {
        let mut sink = DebugTextSink::new();
        sink.set_vertex_buffer_params(9).unwrap();
        sink.upload_vertex_buffer(&[Vertex::default()], 0, 1).unwrap();
        sink.set_bounds(Bounds::new(Vec3::splat(-1.0), Vec3::ONE)).unwrap();
        sink.recompute_normals().unwrap();

        let lines = sink.lines();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "vertex_params count=9");
        assert!(lines[1].starts_with("upload_vertices offset=0 count=1"));
        assert!(lines[2].contains("max=(1.00, 1.00, 1.00)"));
        assert_eq!(lines[3], "recompute_normals");
    }

    #[test]
    fn take_lines_clears() {
        let mut sink = DebugTextSink::new();
        sink.recompute_normals().unwrap();
        assert!(sink.render().contains("recompute_normals"));
        assert_eq!(sink.take_lines().len(), 1);
        assert!(sink.lines().is_empty());
    }
}
