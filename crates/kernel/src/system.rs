//! Passive description of simulated systems and their shapes.

use std::collections::BTreeSet;
use std::fmt;

use smp_common::{AnchorId, BodyId, CollisionId, ConstraintId, SystemId, TagId, Transform};
use smp_solver::{CollisionObject, ConstraintDesc, RigidBody, Solver};

use crate::binding::{ReadMode, SkeletonBinding};

/// What a system can be bound to. Only skeletal meshes are simulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemKind {
    SkeletalMesh { skeleton: AnchorId },
    /// A mesh with no skeleton to follow; rejected on registration.
    Unbound,
}

/// One physics proxy within a system.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub name: String,
    pub collision: CollisionId,
    pub tags: BTreeSet<TagId>,
    /// `None` means the shape always contributes its tags and is never disabled.
    pub disable_tag: Option<TagId>,
    pub disable_priority: i32,
    pub(crate) disabled: bool,
}

impl Shape {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collision: CollisionId::new(),
            tags: BTreeSet::new(),
            disable_tag: None,
            disable_priority: 0,
            disabled: false,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<TagId>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_disable_tag(mut self, tag: impl Into<TagId>, priority: i32) -> Self {
        self.disable_tag = Some(tag.into());
        self.disable_priority = priority;
        self
    }

    /// Result of the last activation pass.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }
}

/// A skeleton bone backed by a rigid body in the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: String,
    pub body: BodyId,
    /// Zero keeps the bone kinematic: it follows the host pose.
    pub mass: f32,
    pub rest: Transform,
}

impl Bone {
    pub fn kinematic(name: impl Into<String>, rest: Transform) -> Self {
        Self::dynamic(name, 0.0, rest)
    }

    pub fn dynamic(name: impl Into<String>, mass: f32, rest: Transform) -> Self {
        Self {
            name: name.into(),
            body: BodyId::new(),
            mass,
            rest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    pub id: ConstraintId,
    pub desc: ConstraintDesc,
}

impl Constraint {
    pub fn new(desc: ConstraintDesc) -> Self {
        Self {
            id: ConstraintId::new(),
            desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstraintGroup {
    pub name: String,
    pub constraints: Vec<Constraint>,
}

/// One simulated skinned-mesh instance.
pub struct System {
    pub(crate) id: Option<SystemId>,
    pub kind: SystemKind,
    pub meshes: Vec<Shape>,
    pub bones: Vec<Bone>,
    pub constraints: Vec<Constraint>,
    pub constraint_groups: Vec<ConstraintGroup>,
    pub(crate) initialized: bool,
    binding: Box<dyn SkeletonBinding>,
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("meshes", &self.meshes.len())
            .field("bones", &self.bones.len())
            .field("constraints", &self.constraints.len())
            .field("constraint_groups", &self.constraint_groups.len())
            .field("initialized", &self.initialized)
            .finish_non_exhaustive()
    }
}

impl System {
    pub fn new(kind: SystemKind, binding: impl SkeletonBinding + 'static) -> Self {
        Self {
            id: None,
            kind,
            meshes: Vec::new(),
            bones: Vec::new(),
            constraints: Vec::new(),
            constraint_groups: Vec::new(),
            initialized: false,
            binding: Box::new(binding),
        }
    }

    pub fn skeletal(skeleton: AnchorId, binding: impl SkeletonBinding + 'static) -> Self {
        Self::new(SystemKind::SkeletalMesh { skeleton }, binding)
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.meshes.push(shape);
        self
    }

    pub fn with_bone(mut self, bone: Bone) -> Self {
        self.bones.push(bone);
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn with_constraint_group(mut self, group: ConstraintGroup) -> Self {
        self.constraint_groups.push(group);
        self
    }

    /// Assigned when the world accepts the system.
    pub fn id(&self) -> Option<SystemId> {
        self.id
    }

    pub fn skeleton(&self) -> Option<AnchorId> {
        match self.kind {
            SystemKind::SkeletalMesh { skeleton } => Some(skeleton),
            SystemKind::Unbound => None,
        }
    }

    pub fn is_skeletal(&self) -> bool {
        self.skeleton().is_some()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Register bone bodies, shapes, constraints and group constraints.
    pub(crate) fn register(&self, solver: &mut dyn Solver) {
        for bone in &self.bones {
            solver.add_rigid_body(RigidBody::dynamic(bone.body, bone.mass, bone.rest));
        }
        for shape in &self.meshes {
            solver.add_collision_object(CollisionObject {
                id: shape.collision,
                transform: Transform::default(),
                enabled: !shape.disabled,
            });
        }
        for c in self.all_constraints() {
            solver.add_constraint(c.id, c.desc);
        }
    }

    /// Remove everything `register` added: shapes, constraints, bone bodies,
    /// then constraint-group constraints.
    pub(crate) fn unregister(&self, solver: &mut dyn Solver) {
        for shape in &self.meshes {
            solver.remove_collision_object(shape.collision);
        }
        for c in &self.constraints {
            solver.remove_constraint(c.id);
        }
        for bone in &self.bones {
            solver.remove_rigid_body(bone.body);
        }
        for group in &self.constraint_groups {
            for c in &group.constraints {
                solver.remove_constraint(c.id);
            }
        }
    }

    /// Push each shape's activation result to its collision object.
    pub(crate) fn apply_activation(&self, solver: &mut dyn Solver) {
        for shape in &self.meshes {
            solver.set_collision_enabled(shape.collision, !shape.disabled);
        }
    }

    fn all_constraints(&self) -> impl Iterator<Item = &Constraint> {
        self.constraints
            .iter()
            .chain(self.constraint_groups.iter().flat_map(|g| g.constraints.iter()))
    }

    /// Pull host bone poses into the solver. An uninitialized system always
    /// snaps on its first read.
    pub(crate) fn read_transform(&mut self, mode: ReadMode, solver: &mut dyn Solver) {
        let mode = if self.initialized { mode } else { ReadMode::Reset };
        self.binding.read_transform(mode, &self.bones, solver);
        self.initialized = true;
    }

    pub(crate) fn write_transform(&mut self, alpha: f32, solver: &dyn Solver) {
        self.binding.write_transform(alpha, &self.bones, solver);
    }

    pub(crate) fn clamp_rotations(&mut self, elapsed: f32, solver: &mut dyn Solver) {
        self.binding.clamp_rotations(elapsed, &self.bones, solver);
    }
}
