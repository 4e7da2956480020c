//! An in-memory [`Host`] that keeps objects in place and records every order
//! it is given. Used by tests, benches and the demo binary.
use crate::*;
use ahash::{AHashMap, AHashSet};
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::Serialize;
use std::cell::RefCell;

type IndexedObject = GeomWithData<[f32; 2], ObjectId>;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderTarget {
    None,
    Location(Position),
    Object(ObjectId),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssuedOrder {
    pub time: u64,
    pub droid: ObjectId,
    pub order: DroidOrder,
    pub target: OrderTarget,
}

#[derive(Debug, Default)]
pub struct SimWorld {
    time: u64,
    objects: AHashMap<ObjectId, GameObject>,
    labels: AHashMap<String, LabelTarget>,
    next_group: u32,
    unreachable: Vec<Area>,
    hidden: AHashSet<ObjectId>,
    research_available: AHashSet<String>,
    pub researching: Vec<(ObjectId, String)>,
    pub issued: Vec<IssuedOrder>,
    // Rebuilt lazily after objects were added, moved or removed
    index: RefCell<Option<RTree<IndexedObject>>>,
}

impl SimWorld {
    pub fn new() -> Self {
        Self::default()
    }

    fn invalidate(&mut self) {
        *self.index.get_mut() = None;
    }

    fn with_index<R>(&self, f: impl FnOnce(&RTree<IndexedObject>) -> R) -> R {
        let mut index = self.index.borrow_mut();
        let tree = index.get_or_insert_with(|| {
            RTree::bulk_load(
                self.objects
                    .values()
                    .map(|o| GeomWithData::new(o.position().to_vec2().to_array(), o.id()))
                    .collect(),
            )
        });
        f(tree)
    }

    pub fn add_droid(&mut self, droid: Droid) -> ObjectId {
        let id = droid.id;
        self.objects.insert(id, GameObject::Droid(droid));
        self.invalidate();
        id
    }

    /// Replaces a droid snapshot, keeping its group if the new one has none.
    pub fn set_droid(&mut self, mut droid: Droid) {
        if droid.group.is_none() {
            droid.group = self.droid(droid.id).and_then(|d| d.group);
        }
        self.add_droid(droid);
    }

    pub fn add_structure(&mut self, structure: Structure) -> ObjectId {
        let id = structure.id;
        self.objects.insert(id, GameObject::Structure(structure));
        self.invalidate();
        id
    }

    pub fn set_label(&mut self, label: impl Into<String>, target: LabelTarget) {
        self.labels.insert(label.into(), target);
    }

    pub fn make_group(&mut self, droids: &[ObjectId]) -> GroupId {
        let group = self.new_group();
        for droid in droids {
            self.group_add_droid(group, *droid);
        }
        group
    }

    pub fn kill(&mut self, id: ObjectId) -> Option<GameObject> {
        self.hidden.remove(&id);
        let removed = self.objects.remove(&id);
        self.invalidate();
        removed
    }

    pub fn advance(&mut self, ms: u64) {
        self.time += ms;
    }

    fn droid(&self, id: ObjectId) -> Option<&Droid> {
        self.objects.get(&id).and_then(GameObject::as_droid)
    }

    fn droid_mut(&mut self, id: ObjectId) -> Option<&mut Droid> {
        self.objects.get_mut(&id).and_then(GameObject::as_droid_mut)
    }

    pub fn set_position(&mut self, id: ObjectId, position: Position) {
        match self.objects.get_mut(&id) {
            Some(GameObject::Droid(d)) => d.position = position,
            Some(GameObject::Structure(s)) => s.position = position,
            None => return,
        }
        self.invalidate();
    }

    pub fn set_health(&mut self, id: ObjectId, health: u32) {
        if let Some(droid) = self.droid_mut(id) {
            droid.health = health;
        }
    }

    pub fn set_ammo(&mut self, id: ObjectId, armed: u32) {
        if let Some(droid) = self.droid_mut(id) {
            droid.armed = armed;
        }
    }

    /// Changes what a droid is doing without recording an issued order.
    pub fn set_order(&mut self, id: ObjectId, order: DroidOrder) {
        if let Some(droid) = self.droid_mut(id) {
            droid.order = order;
        }
    }

    /// Ground units can't path into `area`.
    pub fn mark_unreachable(&mut self, area: Area) {
        self.unreachable.push(area);
    }

    /// Excludes an object from `seen_only` queries.
    pub fn hide(&mut self, id: ObjectId) {
        self.hidden.insert(id);
    }

    pub fn add_research(&mut self, research: impl Into<String>) {
        self.research_available.insert(research.into());
    }

    pub fn orders_for(&self, droid: ObjectId) -> impl Iterator<Item = &IssuedOrder> + '_ {
        self.issued.iter().filter(move |o| o.droid == droid)
    }

    pub fn last_order(&self, droid: ObjectId) -> Option<&IssuedOrder> {
        self.orders_for(droid).last()
    }

    pub fn clear_issued(&mut self) {
        self.issued.clear();
    }

    fn issue(&mut self, droid: ObjectId, order: DroidOrder, target: OrderTarget) {
        self.issued.push(IssuedOrder {
            time: self.time,
            droid,
            order,
            target,
        });
        if let Some(droid) = self.droid_mut(droid) {
            droid.order = order;
        }
    }

    fn sorted<T>(mut items: Vec<T>, id: impl Fn(&T) -> ObjectId) -> Vec<T> {
        items.sort_unstable_by_key(|i| id(i));
        items
    }
}

impl Host for SimWorld {
    fn game_time(&self) -> u64 {
        self.time
    }

    fn enum_group(&self, group: GroupId) -> Vec<Droid> {
        let droids: Vec<Droid> = self
            .objects
            .values()
            .filter_map(GameObject::as_droid)
            .filter(|d| d.group == Some(group))
            .cloned()
            .collect();
        Self::sorted(droids, |d| d.id)
    }

    fn enum_range(
        &self,
        center: Position,
        radius: f32,
        player: PlayerId,
        seen_only: bool,
    ) -> Vec<GameObject> {
        let found = self.with_index(|tree| {
            tree.locate_within_distance(center.to_vec2().to_array(), radius * radius)
                .map(|item| item.data)
                .collect::<Vec<_>>()
        });
        let objects: Vec<GameObject> = found
            .into_iter()
            .filter(|id| !seen_only || !self.hidden.contains(id))
            .filter_map(|id| self.objects.get(&id))
            .filter(|o| o.player() == player)
            .cloned()
            .collect();
        Self::sorted(objects, GameObject::id)
    }

    fn enum_struct(&self, player: PlayerId, stat: Option<StructureType>) -> Vec<Structure> {
        let structures: Vec<Structure> = self
            .objects
            .values()
            .filter_map(|o| match o {
                GameObject::Structure(s) => Some(s),
                GameObject::Droid(_) => None,
            })
            .filter(|s| s.player == player && stat.map_or(true, |t| s.stat == t))
            .cloned()
            .collect();
        Self::sorted(structures, |s| s.id)
    }

    fn enum_droid(&self, player: PlayerId, droid_type: Option<DroidType>) -> Vec<Droid> {
        let droids: Vec<Droid> = self
            .objects
            .values()
            .filter_map(GameObject::as_droid)
            .filter(|d| d.player == player && droid_type.map_or(true, |t| d.droid_type == t))
            .cloned()
            .collect();
        Self::sorted(droids, |d| d.id)
    }

    fn get_object(&self, id: ObjectId) -> Option<GameObject> {
        self.objects.get(&id).cloned()
    }

    fn resolve_label(&self, label: &str) -> Option<LabelTarget> {
        self.labels.get(label).copied()
    }

    fn propulsion_can_reach(&self, propulsion: Propulsion, _from: Position, to: Position) -> bool {
        propulsion == Propulsion::Lift || !self.unreachable.iter().any(|a| a.contains(to))
    }

    fn new_group(&mut self) -> GroupId {
        self.next_group += 1;
        GroupId(self.next_group)
    }

    fn group_add_droid(&mut self, group: GroupId, droid: ObjectId) {
        if let Some(droid) = self.droid_mut(droid) {
            droid.group = Some(group);
        }
    }

    fn order_droid(&mut self, droid: ObjectId, order: DroidOrder) {
        self.issue(droid, order, OrderTarget::None);
    }

    fn order_droid_loc(&mut self, droid: ObjectId, order: DroidOrder, at: Position) {
        self.issue(droid, order, OrderTarget::Location(at));
    }

    fn order_droid_obj(&mut self, droid: ObjectId, order: DroidOrder, target: ObjectId) {
        self.issue(droid, order, OrderTarget::Object(target));
    }

    fn pursue_research(&mut self, lab: ObjectId, research: &str) -> bool {
        if !self.research_available.contains(research)
            || self.researching.iter().any(|(_, r)| r == research)
        {
            return false;
        }
        match self.objects.get_mut(&lab) {
            Some(GameObject::Structure(s)) if s.idle => s.idle = false,
            _ => return false,
        }
        self.researching.push((lab, research.to_owned()));
        true
    }
}
