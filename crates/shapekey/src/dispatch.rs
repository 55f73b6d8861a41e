//! Routing host messages to commands.

use payu_ipc::{
    CommandReport, HostToTools, IpcError, ProgressUpdate, ShapeKeyCommand, ToolsToHost,
};

use crate::commands::{Selection, ShapeKeyTools};
use crate::error::{ShapeKeyError, ShapeKeyResult};
use crate::scene::Scene;

/// Resolve a command's object and key names against the scene.
fn resolve_selection(scene: &Scene, command: &ShapeKeyCommand) -> ShapeKeyResult<Selection> {
    let object = scene
        .find(command.object())
        .ok_or(ShapeKeyError::NoActiveObject)?;
    // Non-mesh objects fall through to the command's own validation
    let key = match (command.key(), scene.mesh(object)) {
        (Some(name), Some(mesh)) => {
            let index = mesh.find(name).and_then(|id| mesh.index_of(id));
            Some(index.ok_or_else(|| ShapeKeyError::NotFound(name.to_string()))?)
        }
        _ => None,
    };
    Ok(Selection {
        object: Some(object),
        key,
    })
}

impl ShapeKeyTools {
    /// Run one command against the scene.
    pub fn handle(
        &self,
        scene: &mut Scene,
        command: &ShapeKeyCommand,
        progress: &mut dyn FnMut(ProgressUpdate),
    ) -> CommandReport {
        tracing::debug!("Handling {:?}", command);
        let selection = match resolve_selection(scene, command) {
            Ok(selection) => selection,
            Err(e) => {
                tracing::warn!("Cannot resolve selection: {}", e);
                return CommandReport::cancelled(e.to_string());
            }
        };

        match command {
            ShapeKeyCommand::SplitActive { .. } => self.split_active(scene, selection),
            ShapeKeyCommand::SplitAll { .. } => self.split_all(scene, selection, progress),
            ShapeKeyCommand::MergeActive { .. } => self.merge_active(scene, selection),
            ShapeKeyCommand::MergeAll { .. } => self.merge_all(scene, selection, progress),
            ShapeKeyCommand::RenameForMmd { .. } => self.rename_for_mmd(scene, selection),
            ShapeKeyCommand::AddLinkages { .. } => self.add_linkages(scene, selection, progress),
            ShapeKeyCommand::AddAllLinkages { .. } => {
                self.add_all_linkages(scene, selection, progress)
            }
            ShapeKeyCommand::RemoveLinkages { .. } => self.remove_linkages(scene, selection),
        }
    }

    /// Handle a JSON [`HostToTools`] message and return the JSON
    /// [`ToolsToHost::Report`] reply.
    ///
    /// Progress updates are forwarded to `on_message` as
    /// [`ToolsToHost::Progress`] values.
    pub fn handle_json(
        &self,
        scene: &mut Scene,
        json: &str,
        on_message: &mut dyn FnMut(ToolsToHost),
    ) -> Result<String, IpcError> {
        let HostToTools::Command(command) = HostToTools::from_json(json)?;
        let report = self.handle(scene, &command, &mut |update: ProgressUpdate| {
            on_message(ToolsToHost::Progress(update))
        });
        ToolsToHost::Report(report).to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use payu_ipc::Outcome;

    use crate::mesh::Mesh;

    fn scene() -> Scene {
        let mut mesh = Mesh::with_basis(
            "Basis",
            vec![Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)],
        );
        let smile = mesh.add_shape_key("Smile");
        mesh.set_positions(smile, vec![Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)])
            .unwrap();
        let mut scene = Scene::new();
        scene.add_mesh("Face", mesh);
        scene
    }

    #[test]
    fn test_handle_resolves_names() {
        let tools = ShapeKeyTools::default();
        let mut scene = scene();
        let command = ShapeKeyCommand::SplitActive {
            object: "Face".to_string(),
            key: Some("Smile".to_string()),
        };
        let report = tools.handle(&mut scene, &command, &mut crate::progress::ignore);
        assert!(report.is_completed(), "{}", report.status);

        let mesh = scene.mesh(scene.find("Face").unwrap()).unwrap();
        assert_eq!(mesh.names(), vec!["Basis", "Smile", "Smile左", "Smile右"]);
    }

    #[test]
    fn test_unknown_names_cancel() {
        let tools = ShapeKeyTools::default();
        let mut scene = scene();
        let command = ShapeKeyCommand::MergeActive {
            object: "Face".to_string(),
            key: Some("Nope".to_string()),
        };
        let report = tools.handle(&mut scene, &command, &mut crate::progress::ignore);
        assert_eq!(report.outcome, Outcome::Cancelled);
        assert_eq!(report.status, "Shape key 'Nope' not found");

        let command = ShapeKeyCommand::SplitAll {
            object: "Body".to_string(),
        };
        let report = tools.handle(&mut scene, &command, &mut crate::progress::ignore);
        assert_eq!(report.status, "No active object");
    }

    #[test]
    fn test_handle_json_round_trip() {
        let tools = ShapeKeyTools::default();
        let mut scene = scene();
        let json = r#"{"type":"Command","data":{"type":"SplitAll","data":{"object":"Face"}}}"#;

        let mut messages = Vec::new();
        let reply = tools
            .handle_json(&mut scene, json, &mut |message: ToolsToHost| messages.push(message))
            .unwrap();

        let ToolsToHost::Report(report) = ToolsToHost::from_json(&reply).unwrap() else {
            panic!("expected a report");
        };
        assert!(report.is_completed());
        assert_eq!(report.counts.unwrap().succeeded, 1);
        assert_eq!(
            messages.first(),
            Some(&ToolsToHost::Progress(ProgressUpdate::Begin { total: 1 }))
        );
        assert_eq!(messages.last(), Some(&ToolsToHost::Progress(ProgressUpdate::End)));
    }

    #[test]
    fn test_handle_json_rejects_garbage() {
        let tools = ShapeKeyTools::default();
        let mut scene = scene();
        assert!(matches!(
            tools.handle_json(&mut scene, "", &mut |_: ToolsToHost| {}),
            Err(IpcError::Empty)
        ));
        assert!(tools.handle_json(&mut scene, "{nope", &mut |_: ToolsToHost| {}).is_err());
    }
}
