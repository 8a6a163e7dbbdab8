use crate::*;

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

const REPEATER: ElementId = ElementId(1);
const FIRST_ELEMENT: u64 = 1000;

/// Everything the test doubles share: the fake visual tree, focus and the factory's pool.
#[derive(Default)]
struct World {
    next_id: u64,
    free: Vec<ElementId>,
    live: BTreeSet<ElementId>,
    heights: BTreeMap<ElementId, f64>,
    parents: BTreeMap<ElementId, ElementId>,
    arranged: BTreeMap<ElementId, Rect>,
    horizontal: bool,
    focused: Option<ElementId>,
    not_focusable: BTreeSet<ElementId>,
    focusable_descendant: BTreeMap<ElementId, ElementId>,
    fail_indices: BTreeSet<usize>,
    animate: bool,
    animating: Vec<ElementId>,
}

type Shared = Rc<RefCell<World>>;

fn world() -> Shared {
    Rc::new(RefCell::new(World::default()))
}

trait Item {
    fn extent(&self) -> f64;
}

impl Item for u32 {
    fn extent(&self) -> f64 {
        *self as f64
    }
}

impl Item for (u64, u32) {
    fn extent(&self) -> f64 {
        self.1 as f64
    }
}

struct TestFactory(Shared);

impl<T: Item> ElementFactory<T> for TestFactory {
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, T>) -> Option<ElementId> {
        let mut w = self.0.borrow_mut();
        assert_eq!(args.parent, REPEATER);
        if w.fail_indices.contains(&args.index) {
            return None;
        }
        let element = match w.free.pop() {
            Some(element) => element,
            None => {
                w.next_id += 1;
                ElementId(FIRST_ELEMENT + w.next_id)
            }
        };
        assert!(w.live.insert(element), "factory handed out {element:?} twice");
        w.heights.insert(element, args.data.extent());
        Some(element)
    }

    fn recycle_element(&mut self, args: ElementFactoryRecycleArgs) {
        let mut w = self.0.borrow_mut();
        assert!(
            w.live.remove(&args.element),
            "{:?} recycled but not live",
            args.element
        );
        w.free.push(args.element);
    }
}

struct TestHost(Shared);

impl VisualHost for TestHost {
    fn attach_child(&mut self, parent: ElementId, child: ElementId) {
        self.0.borrow_mut().parents.insert(child, parent);
    }

    fn detach_child(&mut self, parent: ElementId, child: ElementId) {
        let removed = self.0.borrow_mut().parents.remove(&child);
        assert_eq!(removed, Some(parent));
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.0.borrow().parents.get(&element).copied()
    }

    fn measure(&mut self, element: ElementId, _available: Size) -> Size {
        let w = self.0.borrow();
        let major = w.heights.get(&element).copied().unwrap_or(0.0);
        if w.horizontal {
            Size::new(major, 30.0)
        } else {
            Size::new(50.0, major)
        }
    }

    fn arrange(&mut self, element: ElementId, bounds: Rect) {
        self.0.borrow_mut().arranged.insert(element, bounds);
    }

    fn is_focusable(&self, element: ElementId) -> bool {
        !self.0.borrow().not_focusable.contains(&element)
    }

    fn find_first_focusable(&self, subtree: ElementId) -> Option<ElementId> {
        self.0.borrow().focusable_descendant.get(&subtree).copied()
    }

    fn find_last_focusable(&self, subtree: ElementId) -> Option<ElementId> {
        self.0.borrow().focusable_descendant.get(&subtree).copied()
    }

    fn focus(&mut self, element: ElementId) -> bool {
        self.0.borrow_mut().focused = Some(element);
        true
    }
}

struct TestAnimator(Shared);

impl ElementAnimator for TestAnimator {
    fn start_hide_animation(&mut self, element: ElementId) -> bool {
        let mut w = self.0.borrow_mut();
        if w.animate {
            w.animating.push(element);
        }
        w.animate
    }
}

fn repeater(world: &Shared, extents: Vec<u32>) -> ItemsRepeater<u32> {
    let mut r = ItemsRepeater::new(
        REPEATER,
        ItemsSourceView::new(extents),
        TestFactory(world.clone()),
        TestHost(world.clone()),
    );
    r.set_layout(Some(StackLayout::new().into())).unwrap();
    r
}

fn keyed_repeater(world: &Shared, items: Vec<(u64, u32)>) -> ItemsRepeater<(u64, u32)> {
    let mut r = ItemsRepeater::new(
        REPEATER,
        ItemsSourceView::with_keys(items, |item: &(u64, u32)| item.0),
        TestFactory(world.clone()),
        TestHost(world.clone()),
    );
    r.set_layout(Some(StackLayout::new().into())).unwrap();
    r
}

fn keyed_items(count: u64, extent: u32) -> Vec<(u64, u32)> {
    (0..count).map(|key| (key, extent)).collect()
}

fn layout_pass<T, K: UniqueKey>(r: &mut ItemsRepeater<T, K>, start: f64, len: f64) -> Size {
    let window = Rect::new(0.0, start, 100.0, len);
    r.set_viewport(window, window);
    full_pass(r)
}

fn full_pass<T, K: UniqueKey>(r: &mut ItemsRepeater<T, K>) -> Size {
    let desired = r.measure(Size::new(100.0, f64::INFINITY)).unwrap();
    r.arrange(Size::new(100.0, desired.height)).unwrap();
    desired
}

fn held<T, K: UniqueKey>(r: &ItemsRepeater<T, K>) -> Vec<(usize, ElementId)> {
    let mut out: Vec<(usize, ElementId)> = r
        .children()
        .iter()
        .filter_map(|&element| {
            let info = r.view_manager().info(element)?;
            if info.is_held_by_layout() {
                info.index().map(|index| (index, element))
            } else {
                None
            }
        })
        .collect();
    out.sort();
    out
}

fn held_indices<T, K: UniqueKey>(r: &ItemsRepeater<T, K>) -> Vec<usize> {
    held(r).into_iter().map(|(index, _)| index).collect()
}

fn owner<T, K: UniqueKey>(r: &ItemsRepeater<T, K>, element: ElementId) -> ElementOwner {
    r.view_manager().info(element).unwrap().owner()
}

fn assert_consistent<T, K: UniqueKey>(r: &ItemsRepeater<T, K>, world: &Shared) {
    let w = world.borrow();
    let vm = r.view_manager();
    let mut live_records = 0;
    let mut pinned_records = 0;
    for (element, info) in vm.records() {
        let attached = r.children().contains(&element);
        match info.owner() {
            ElementOwner::ElementFactory => {
                assert!(!attached, "{element:?} is back in the factory but still attached");
                assert_eq!(info.index(), None);
                assert_eq!(info.pin_count(), 0);
                assert!(!w.live.contains(&element));
            }
            owner => {
                live_records += 1;
                assert!(attached, "{element:?} owned by {owner:?} is detached");
                assert!(w.live.contains(&element));
                assert_eq!(w.parents.get(&element), Some(&REPEATER));
                if owner == ElementOwner::PinnedPool {
                    pinned_records += 1;
                    assert!(vm.pinned_elements().contains(&element));
                }
            }
        }
        if info.is_realized() {
            let index = info.index().unwrap();
            assert!(index < r.items().count(), "{element:?} realized at stale index {index}");
        }
    }
    assert_eq!(live_records, w.live.len());
    assert_eq!(r.children().len(), w.live.len());
    assert_eq!(pinned_records, vm.pinned_elements().len());
    assert_eq!(
        vm.first_realized_index().is_some(),
        vm.last_realized_index().is_some()
    );
}

fn assert_settled<T, K: UniqueKey>(r: &ItemsRepeater<T, K>) {
    let vm = r.view_manager();
    assert_eq!(vm.reset_pool_len(), 0);
    assert!(!vm.is_stable_reset_pending());

    let mut seen = BTreeSet::new();
    for &element in r.children() {
        let info = vm.info(element).unwrap();
        let managed = (info.is_held_by_layout() && !info.auto_recycle_candidate())
            || info.owner() == ElementOwner::PinnedPool;
        if managed {
            let index = info.index().unwrap();
            assert!(seen.insert(index), "index {index} realized twice");
        }
    }
}

#[test]
fn stack_realizes_only_the_window() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    let desired = layout_pass(&mut r, 0.0, 100.0);

    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_eq!(desired, Size::new(50.0, 20000.0));
    assert_eq!(r.view_manager().realized_range(), Some((0, 4)));

    let (_, e2) = held(&r)[2];
    assert_eq!(world.borrow().arranged[&e2], Rect::new(0.0, 40.0, 100.0, 20.0));
    assert_consistent(&r, &world);
}

#[test]
fn scrolling_far_recycles_every_element() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    layout_pass(&mut r, 1000.0, 100.0);

    assert_eq!(held_indices(&r), vec![50, 51, 52, 53, 54]);
    let w = world.borrow();
    assert_eq!(w.live.len(), 5);
    assert_eq!(w.next_id, 5, "scrolling must reuse recycled elements");
    drop(w);
    assert_consistent(&r, &world);
}

#[test]
fn small_scroll_keeps_overlapping_elements() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    let e3 = r.try_get_element(3).unwrap();

    layout_pass(&mut r, 50.0, 100.0);
    assert_eq!(held_indices(&r), vec![2, 3, 4, 5, 6, 7]);
    assert_eq!(r.try_get_element(3), Some(e3));
    assert_eq!(r.view_manager().realized_range(), Some((2, 7)));
    assert_consistent(&r, &world);
}

#[test]
fn window_past_the_extent_realizes_nothing() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    let desired = layout_pass(&mut r, 50000.0, 100.0);

    assert!(held(&r).is_empty());
    assert_eq!(desired.height, 20000.0);
    assert!(r.children().is_empty());
    assert_consistent(&r, &world);
}

#[test]
fn infinite_window_realizes_everything() {
    let world = world();
    let extents: Vec<u32> = (0..10).map(|i| 10 + i).collect();
    let mut r = repeater(&world, extents);
    let desired = full_pass(&mut r);

    assert_eq!(held_indices(&r), (0..10).collect::<Vec<_>>());
    assert_eq!(desired, Size::new(50.0, 145.0));
    assert_consistent(&r, &world);
}

#[test]
fn horizontal_spacing_and_minor_stretch() {
    let world = world();
    world.borrow_mut().horizontal = true;
    let mut r = ItemsRepeater::<u32>::new(
        REPEATER,
        ItemsSourceView::new(vec![50u32; 10]),
        TestFactory(world.clone()),
        TestHost(world.clone()),
    );
    let layout = StackLayout::new()
        .with_orientation(Orientation::Horizontal)
        .with_spacing(5.0);
    r.set_layout(Some(layout.into())).unwrap();

    let desired = r.measure(Size::new(f64::INFINITY, 40.0)).unwrap();
    assert_eq!(desired, Size::new(545.0, 30.0));
    r.arrange(Size::new(545.0, 40.0)).unwrap();

    let e1 = r.try_get_element(1).unwrap();
    assert_eq!(world.borrow().arranged[&e1], Rect::new(55.0, 0.0, 50.0, 40.0));
}

#[test]
fn negative_spacing_is_clamped() {
    assert_eq!(StackLayout::new().with_spacing(-3.0).spacing(), 0.0);
}

#[test]
fn extent_estimate_uses_average_for_unrealized_items() {
    let world = world();
    let mut extents = vec![10u32; 5];
    extents.extend(vec![30u32; 95]);
    let mut r = repeater(&world, extents);
    let desired = layout_pass(&mut r, 0.0, 50.0);

    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_eq!(desired.height, 1000.0);

    let Some(LayoutState::Stack(state)) = r.layout_state() else {
        panic!("stack layout state missing");
    };
    assert_eq!(state.total_elements_measured(), 5);
    assert_eq!(state.average_element_size(), 10.0);
    assert_eq!(state.realized_range(), Some((0, 4)));
    assert_eq!(state.last_extent(), Rect::new(0.0, 0.0, 50.0, 1000.0));
}

#[test]
fn estimator_converges_to_the_uniform_size() {
    let mut state = StackLayoutState::new();
    assert_eq!(state.average_element_size(), 0.0);
    for index in 0..37 {
        state.on_element_measured(index, 25.0, 10.0);
    }
    assert_eq!(state.average_element_size(), 25.0);
    assert_eq!(state.total_elements_measured(), 37);

    for index in 0..(3 * ESTIMATION_BUFFER_SIZE) {
        state.on_element_measured(index, 25.0, 10.0);
    }
    assert_eq!(state.average_element_size(), 25.0);
    assert_eq!(state.total_elements_measured(), ESTIMATION_BUFFER_SIZE);
}

#[test]
fn estimator_overwrites_colliding_slots() {
    let mut state = StackLayoutState::new();
    state.on_element_measured(3, 10.0, 7.0);
    state.on_element_measured(3 + ESTIMATION_BUFFER_SIZE, 16.0, 4.0);

    assert_eq!(state.total_elements_measured(), 1);
    assert_eq!(state.total_element_size(), 16.0);
    assert_eq!(state.average_element_size(), 16.0);
    assert_eq!(state.max_arrange_bounds(), 7.0);

    state.on_arrange_layout_end();
    assert_eq!(state.max_arrange_bounds(), 0.0);
}

#[test]
fn factory_failure_stops_generation_until_it_recovers() {
    let world = world();
    world.borrow_mut().fail_indices.insert(3);
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    assert_eq!(held_indices(&r), vec![0, 1, 2]);
    assert_consistent(&r, &world);

    world.borrow_mut().fail_indices.clear();
    full_pass(&mut r);
    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_consistent(&r, &world);
}


#[test]
fn insert_shifts_realized_indices_and_fills_the_gap() {
    let world = world();
    let moves = Arc::new(Mutex::new(Vec::new()));
    let events = RepeaterEvents::new().with_element_index_changed({
        let moves = moves.clone();
        move |element, old, new| moves.lock().unwrap().push((element, old, new))
    });
    let mut r = repeater(&world, vec![20; 100]).with_events(events);
    layout_pass(&mut r, 0.0, 100.0);
    let before: Vec<ElementId> = held(&r).into_iter().map(|(_, e)| e).collect();

    r.insert_items(2, vec![20]).unwrap();
    assert!(r.needs_measure());
    let mut recorded = moves.lock().unwrap().clone();
    recorded.sort();
    let mut expected = vec![(before[2], 2, 3), (before[3], 3, 4), (before[4], 4, 5)];
    expected.sort();
    assert_eq!(recorded, expected);
    assert_eq!(r.view_manager().realized_range(), Some((0, 5)));

    full_pass(&mut r);
    let after = held(&r);
    assert_eq!(after.len(), 5);
    assert_eq!(after[0], (0, before[0]));
    assert_eq!(after[1], (1, before[1]));
    assert!(!before.contains(&after[2].1), "inserted item needs a fresh element");
    assert_eq!(after[3], (3, before[2]));
    assert_eq!(after[4], (4, before[3]));
    assert_eq!(owner(&r, before[4]), ElementOwner::ElementFactory);
    assert_consistent(&r, &world);
}

#[test]
fn remove_recycles_immediately_and_shifts_followers() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);
    let before: Vec<ElementId> = held(&r).into_iter().map(|(_, e)| e).collect();

    r.remove_items(1, 2).unwrap();
    assert_eq!(owner(&r, before[1]), ElementOwner::ElementFactory);
    assert_eq!(owner(&r, before[2]), ElementOwner::ElementFactory);
    assert_eq!(r.get_element_index(before[3]), Ok(Some(1)));
    assert_eq!(r.get_element_index(before[4]), Ok(Some(2)));
    assert_eq!(r.view_manager().realized_range(), None);
    assert_consistent(&r, &world);

    full_pass(&mut r);
    let after = held(&r);
    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_eq!(after[0].1, before[0]);
    assert_eq!(after[1].1, before[3]);
    assert_eq!(after[2].1, before[4]);
    assert_consistent(&r, &world);
}

#[test]
fn replace_with_different_count_shifts_followers() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);
    let e4 = r.try_get_element(4).unwrap();

    r.replace_items(1, 1, vec![20, 20, 20]).unwrap();
    assert_eq!(r.items().count(), 102);
    assert_eq!(r.get_element_index(e4), Ok(Some(6)));

    full_pass(&mut r);
    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_eq!(owner(&r, e4), ElementOwner::ElementFactory);
    assert_consistent(&r, &world);
}

#[test]
fn unkeyed_reset_recycles_everything() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);

    r.reset_items(vec![20; 3]).unwrap();
    assert!(r.children().is_empty());
    assert!(!r.view_manager().is_stable_reset_pending());

    full_pass(&mut r);
    assert_eq!(held_indices(&r), vec![0, 1, 2]);
    assert_consistent(&r, &world);
}

#[test]
fn stable_reset_reuses_elements_by_key() {
    let world = world();
    let mut r = keyed_repeater(&world, keyed_items(50, 20));
    layout_pass(&mut r, 0.0, 100.0);
    assert_settled(&r);
    let before: Vec<ElementId> = held(&r).into_iter().map(|(_, e)| e).collect();
    r.update_pin(before[2], true).unwrap();

    let mut items = vec![(100, 20)];
    items.extend(keyed_items(50, 20));
    r.reset_items(items).unwrap();

    // Structural clears ignore the pin and park by key.
    assert!(r.view_manager().is_stable_reset_pending());
    assert_eq!(r.view_manager().reset_pool_len(), 5);
    for &element in &before {
        assert_eq!(owner(&r, element), ElementOwner::UniqueIdResetPool);
    }
    assert_consistent(&r, &world);

    full_pass(&mut r);
    assert_settled(&r);
    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    for key in 0..4 {
        assert_eq!(r.try_get_element(key + 1), Some(before[key]));
    }
    assert_eq!(owner(&r, before[4]), ElementOwner::ElementFactory);
    assert!(r.view_manager().info(before[2]).unwrap().is_pinned());
    assert_consistent(&r, &world);
}

#[test]
fn layout_change_parks_elements_for_the_new_layout() {
    let world = world();
    let mut r = keyed_repeater(&world, keyed_items(50, 20));
    layout_pass(&mut r, 0.0, 100.0);
    let before: Vec<ElementId> = held(&r).into_iter().map(|(_, e)| e).collect();

    r.set_layout(Some(StackLayout::new().with_spacing(2.0).into()))
        .unwrap();
    assert_eq!(r.view_manager().reset_pool_len(), 5);
    assert!(r.needs_measure());

    full_pass(&mut r);
    assert_settled(&r);
    assert_eq!(r.try_get_element(0), Some(before[0]));
    assert_eq!(r.try_get_element(3), Some(before[3]));
    assert_consistent(&r, &world);
}

#[test]
fn pinned_elements_skip_the_reset_pool_on_layout_change() {
    let world = world();
    let mut r = keyed_repeater(&world, keyed_items(50, 20));
    layout_pass(&mut r, 0.0, 100.0);
    let before: Vec<ElementId> = held(&r).into_iter().map(|(_, e)| e).collect();
    r.update_pin(before[2], true).unwrap();

    r.set_layout(Some(StackLayout::new().into())).unwrap();
    assert!(r.view_manager().is_stable_reset_pending());
    assert_eq!(owner(&r, before[2]), ElementOwner::PinnedPool);
    assert_eq!(r.view_manager().pinned_elements(), &[before[2]]);
    assert_eq!(r.view_manager().reset_pool_len(), 4);
    for (i, &element) in before.iter().enumerate() {
        if i != 2 {
            assert_eq!(owner(&r, element), ElementOwner::UniqueIdResetPool);
        }
    }
    assert_consistent(&r, &world);

    full_pass(&mut r);
    assert_settled(&r);
    assert_eq!(r.try_get_element(2), Some(before[2]));
    assert!(r.view_manager().pinned_elements().is_empty());
    assert!(r.view_manager().info(before[2]).unwrap().is_pinned());
    assert_consistent(&r, &world);
}

#[test]
fn removing_the_layout_clears_every_child() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);

    r.set_layout(None).unwrap();
    assert!(r.children().is_empty());
    assert!(r.layout().is_none());
    assert!(r.layout_state().is_none());
    assert_eq!(r.get_or_create_element(0), Err(RepeaterError::NoLayout));
    assert_consistent(&r, &world);
}

#[test]
fn pinned_element_survives_scrolling_and_is_recovered() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    let e1 = r.try_get_element(1).unwrap();
    r.update_pin(e1, true).unwrap();

    layout_pass(&mut r, 1000.0, 100.0);
    assert_eq!(owner(&r, e1), ElementOwner::PinnedPool);
    assert_eq!(r.view_manager().pinned_elements(), &[e1]);
    assert_eq!(r.get_element_index(e1), Ok(Some(1)));
    assert_eq!(
        world.borrow().arranged[&e1],
        Rect::new(-10000.0, -10000.0, 0.0, 0.0)
    );
    assert_consistent(&r, &world);

    layout_pass(&mut r, 0.0, 100.0);
    assert_eq!(r.try_get_element(1), Some(e1));
    assert!(r.view_manager().pinned_elements().is_empty());
    assert_consistent(&r, &world);
}

#[test]
fn unpinning_recycles_on_the_next_pass_only() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    let e1 = r.try_get_element(1).unwrap();
    r.update_pin(e1, true).unwrap();
    layout_pass(&mut r, 1000.0, 100.0);
    assert!(!r.needs_measure());

    r.update_pin(e1, false).unwrap();
    assert_eq!(owner(&r, e1), ElementOwner::PinnedPool);
    assert!(r.needs_measure());

    full_pass(&mut r);
    assert_eq!(owner(&r, e1), ElementOwner::ElementFactory);
    assert!(r.view_manager().pinned_elements().is_empty());
    assert_consistent(&r, &world);
}

#[test]
fn pins_count_through_nested_elements_and_never_underflow() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);
    let e2 = r.try_get_element(2).unwrap();
    let nested = ElementId(9001);
    let deeper = ElementId(9002);
    world.borrow_mut().parents.insert(nested, e2);
    world.borrow_mut().parents.insert(deeper, nested);

    r.update_pin(deeper, true).unwrap();
    r.update_pin(nested, true).unwrap();
    assert_eq!(r.view_manager().info(e2).unwrap().pin_count(), 2);

    for _ in 0..3 {
        r.update_pin(deeper, false).unwrap();
    }
    assert_eq!(r.view_manager().info(e2).unwrap().pin_count(), 0);

    // Not under this repeater: ignored.
    r.update_pin(ElementId(424242), true).unwrap();
}

fn focus_fixture(world: &Shared, indices: &[usize]) -> (ItemsRepeater<u32>, Vec<ElementId>) {
    let mut r = repeater(world, vec![20; 10]);
    let elements = indices
        .iter()
        .map(|&index| r.get_or_create_element(index).unwrap())
        .collect();
    (r, elements)
}

#[test]
fn focus_moves_to_the_next_realized_index() {
    let world = world();
    let (mut r, e) = focus_fixture(&world, &[3, 5, 7]);
    r.on_focus_changed(Some(e[1])).unwrap();
    assert_eq!(r.view_manager().info(e[1]).unwrap().pin_count(), 1);

    r.replace_items(5, 1, vec![20]).unwrap();
    assert_eq!(owner(&r, e[1]), ElementOwner::ElementFactory);
    assert_eq!(world.borrow().focused, Some(e[2]));
    assert_eq!(r.view_manager().last_focused_element(), Some(e[2]));
    assert_eq!(r.view_manager().info(e[2]).unwrap().pin_count(), 1);
    assert_consistent(&r, &world);
}

#[test]
fn focus_falls_back_to_the_previous_index() {
    let world = world();
    let (mut r, e) = focus_fixture(&world, &[3, 5]);
    r.on_focus_changed(Some(e[1])).unwrap();
    r.replace_items(5, 1, vec![20]).unwrap();

    assert_eq!(world.borrow().focused, Some(e[0]));
    assert_eq!(r.view_manager().last_focused_element(), Some(e[0]));
}

#[test]
fn focus_uses_a_focusable_descendant() {
    let world = world();
    let (mut r, e) = focus_fixture(&world, &[3, 5, 7]);
    let inner = ElementId(9007);
    {
        let mut w = world.borrow_mut();
        w.not_focusable.insert(e[2]);
        w.focusable_descendant.insert(e[2], inner);
    }
    r.on_focus_changed(Some(e[1])).unwrap();
    r.replace_items(5, 1, vec![20]).unwrap();

    assert_eq!(world.borrow().focused, Some(inner));
    assert_eq!(r.view_manager().last_focused_element(), Some(e[2]));
}

#[test]
fn focus_is_dropped_without_candidates() {
    let world = world();
    let (mut r, e) = focus_fixture(&world, &[5]);
    r.on_focus_changed(Some(e[0])).unwrap();
    r.remove_items(5, 1).unwrap();

    assert_eq!(r.view_manager().last_focused_element(), None);
    assert_eq!(world.borrow().focused, None);
}

#[test]
fn focus_change_moves_the_pin() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]);
    layout_pass(&mut r, 0.0, 100.0);
    let e1 = r.try_get_element(1).unwrap();
    let e3 = r.try_get_element(3).unwrap();

    r.on_focus_changed(Some(e1)).unwrap();
    r.on_focus_changed(Some(e3)).unwrap();
    assert_eq!(r.view_manager().info(e1).unwrap().pin_count(), 0);
    assert_eq!(r.view_manager().info(e3).unwrap().pin_count(), 1);

    r.on_focus_changed(None).unwrap();
    assert_eq!(r.view_manager().info(e3).unwrap().pin_count(), 0);
    assert_eq!(r.view_manager().last_focused_element(), None);
}

#[test]
fn made_anchor_is_adopted_by_the_next_measure() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);

    let anchor = r.get_or_create_element(50).unwrap();
    assert_eq!(r.made_anchor(), Some(anchor));
    let info = r.view_manager().info(anchor).unwrap();
    assert!(info.auto_recycle_candidate());
    assert!(info.keep_alive());
    assert_eq!(r.get_or_create_element(50), Ok(anchor));

    layout_pass(&mut r, 1000.0, 100.0);
    assert_eq!(r.made_anchor(), None);
    assert_eq!(r.try_get_element(50), Some(anchor));
    assert!(!r.view_manager().info(anchor).unwrap().auto_recycle_candidate());
    assert_eq!(held_indices(&r), vec![50, 51, 52, 53, 54]);
    assert_settled(&r);
    assert_consistent(&r, &world);
}

#[test]
fn far_anchor_leaves_no_gap_in_the_realized_range() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);

    r.get_or_create_element(500).unwrap();
    layout_pass(&mut r, 10_000.0, 100.0);
    assert_eq!(held_indices(&r), vec![500, 501, 502, 503, 504]);
    assert_eq!(r.view_manager().realized_range(), Some((500, 504)));

    r.get_or_create_element(0).unwrap();
    layout_pass(&mut r, 0.0, 100.0);
    assert_eq!(held_indices(&r), vec![0, 1, 2, 3, 4]);
    assert_eq!(r.view_manager().realized_range(), Some((0, 4)));
    assert_consistent(&r, &world);
}

#[test]
fn unused_candidates_live_one_extra_pass() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);

    let stray = r.get_or_create_element(50).unwrap();
    let anchor = r.get_or_create_element(60).unwrap();
    layout_pass(&mut r, 1200.0, 100.0);
    assert_eq!(r.try_get_element(60), Some(anchor));
    assert_eq!(owner(&r, stray), ElementOwner::Layout);
    assert!(!r.view_manager().info(stray).unwrap().keep_alive());

    full_pass(&mut r);
    assert_eq!(owner(&r, stray), ElementOwner::ElementFactory);
    assert_consistent(&r, &world);
}

#[test]
fn removed_elements_wait_for_their_hide_animation() {
    let world = world();
    world.borrow_mut().animate = true;
    let mut r = repeater(&world, vec![20; 100]).with_animator(TestAnimator(world.clone()));
    layout_pass(&mut r, 0.0, 100.0);
    let e1 = r.try_get_element(1).unwrap();

    r.remove_items(1, 1).unwrap();
    assert_eq!(owner(&r, e1), ElementOwner::Animator);
    assert_eq!(world.borrow().animating, vec![e1]);
    assert_eq!(r.get_element_index(e1), Ok(None));
    assert!(r.children().contains(&e1));

    full_pass(&mut r);
    assert_eq!(owner(&r, e1), ElementOwner::Animator);
    assert!(!held(&r).iter().any(|&(_, e)| e == e1));
    assert_consistent(&r, &world);

    r.on_hide_animation_complete(e1).unwrap();
    assert_eq!(owner(&r, e1), ElementOwner::ElementFactory);
    assert!(!r.children().contains(&e1));
    assert_consistent(&r, &world);
}

#[test]
fn declined_hide_animation_recycles_directly() {
    let world = world();
    let mut r = repeater(&world, vec![20; 100]).with_animator(TestAnimator(world.clone()));
    layout_pass(&mut r, 0.0, 100.0);
    let e1 = r.try_get_element(1).unwrap();

    r.remove_items(1, 1).unwrap();
    assert_eq!(owner(&r, e1), ElementOwner::ElementFactory);
    assert!(world.borrow().animating.is_empty());
}

#[test]
fn scrolling_never_animates() {
    let world = world();
    world.borrow_mut().animate = true;
    let mut r = repeater(&world, vec![20; 1000]).with_animator(TestAnimator(world.clone()));
    layout_pass(&mut r, 0.0, 100.0);
    layout_pass(&mut r, 1000.0, 100.0);

    assert!(world.borrow().animating.is_empty());
    assert_consistent(&r, &world);
}

#[test]
fn lifecycle_events_fire() {
    let world = world();
    let prepared = Arc::new(Mutex::new(Vec::new()));
    let clearing = Arc::new(Mutex::new(Vec::new()));
    let events = RepeaterEvents::new()
        .with_element_prepared({
            let prepared = prepared.clone();
            move |element, index| prepared.lock().unwrap().push((element, index))
        })
        .with_element_clearing({
            let clearing = clearing.clone();
            move |element| clearing.lock().unwrap().push(element)
        });
    let mut r = repeater(&world, vec![20; 1000]).with_events(events);
    layout_pass(&mut r, 0.0, 100.0);

    // The first sample for the size estimate is prepared and cleared once.
    let prepared_indices: Vec<usize> = prepared.lock().unwrap().iter().map(|&(_, i)| i).collect();
    assert_eq!(prepared_indices, vec![0, 0, 1, 2, 3, 4]);
    assert_eq!(clearing.lock().unwrap().len(), 1);

    layout_pass(&mut r, 1000.0, 100.0);
    assert_eq!(clearing.lock().unwrap().len(), 6);
}

#[test]
fn unknown_elements_are_reported() {
    let world = world();
    let mut r = repeater(&world, vec![20; 10]);
    let stranger = ElementId(424242);

    assert_eq!(
        r.get_element_index(stranger),
        Err(RepeaterError::UnknownElement(stranger))
    );
    assert_eq!(
        r.on_hide_animation_complete(stranger),
        Err(RepeaterError::UnknownElement(stranger))
    );
    assert_eq!(
        r.view_manager().element_index(stranger),
        Err(RepeaterError::UnknownElement(stranger))
    );
}

#[test]
fn recycled_elements_report_no_index() {
    let world = world();
    let mut r = repeater(&world, vec![20; 1000]);
    layout_pass(&mut r, 0.0, 100.0);
    let e0 = r.try_get_element(0).unwrap();

    r.remove_items(0, 1).unwrap();
    assert_eq!(owner(&r, e0), ElementOwner::ElementFactory);
    assert_eq!(r.get_element_index(e0), Ok(None));
    assert_eq!(r.view_manager().element_index(e0), Ok(None));
}

#[test]
fn get_or_create_validates_its_input() {
    let world = world();
    let mut bare = ItemsRepeater::<u32>::new(
        REPEATER,
        ItemsSourceView::new(vec![20; 10]),
        TestFactory(world.clone()),
        TestHost(world.clone()),
    );
    assert_eq!(bare.get_or_create_element(0), Err(RepeaterError::NoLayout));
    assert_eq!(
        bare.get_or_create_element(10),
        Err(RepeaterError::IndexOutOfRange { index: 10, count: 10 })
    );

    world.borrow_mut().fail_indices.insert(4);
    let mut r = repeater(&world, vec![20; 10]);
    assert_eq!(
        r.get_or_create_element(4),
        Err(RepeaterError::ElementFactoryFailed { index: 4 })
    );
    assert_eq!(r.made_anchor(), None);
}

#[test]
fn operations_during_layout_are_rejected() {
    let world = world();
    let mut r = repeater(&world, vec![20; 10]);
    r.is_layout_in_progress = true;

    assert_eq!(
        r.set_layout(Some(StackLayout::new().into())),
        Err(RepeaterError::LayoutChangeDuringLayout)
    );
    assert_eq!(
        r.insert_items(0, vec![1]),
        Err(RepeaterError::ItemsChangedDuringLayout)
    );
    assert_eq!(
        r.remove_items(0, 1),
        Err(RepeaterError::ItemsChangedDuringLayout)
    );
    assert_eq!(
        r.reset_items(Vec::new()),
        Err(RepeaterError::ItemsChangedDuringLayout)
    );
    assert_eq!(
        r.get_or_create_element(0),
        Err(RepeaterError::GetOrCreateDuringLayout)
    );
    assert_eq!(
        r.measure(Size::new(100.0, 100.0)),
        Err(RepeaterError::LayoutReentrancy)
    );
    assert_eq!(
        r.arrange(Size::new(100.0, 100.0)),
        Err(RepeaterError::LayoutReentrancy)
    );
    assert_eq!(r.items().count(), 10);
}

#[test]
fn items_view_maps_keys_and_clamps_changes() {
    let mut view = ItemsSourceView::with_keys(vec![(7u64, 1u32), (9, 2), (11, 3)], |item: &(u64, u32)| item.0);
    assert!(view.has_key_index_mapping());
    assert_eq!(view.key_from_index(1), Some(9));
    assert_eq!(view.key_from_index(3), None);
    assert_eq!(view.index_from_key(&11), Some(2));
    assert_eq!(view.index_from_key(&8), None);

    assert_eq!(
        view.remove(2, 10),
        CollectionChange::Remove { index: 2, count: 1 }
    );
    assert_eq!(
        view.insert(99, vec![(1, 1)]),
        CollectionChange::Insert { index: 2, count: 1 }
    );
    assert_eq!(view.count(), 3);
    assert!(CollectionChange::Reset.forces_clear());
    assert!(!CollectionChange::Insert { index: 0, count: 1 }.forces_clear());

    let plain = ItemsSourceView::<u32, ItemKey>::new(vec![1, 2]);
    assert!(!plain.has_key_index_mapping());
    assert_eq!(plain.key_from_index(0), None);
}

#[test]
fn ownership_stays_exclusive_under_random_operations() {
    for seed in [1u64, 7, 42, 1234, 98765] {
        let world = world();
        let mut rng = Lcg::new(seed);
        let mut next_key = 0u64;
        let mut fresh = |rng: &mut Lcg, n: usize| -> Vec<(u64, u32)> {
            (0..n)
                .map(|_| {
                    next_key += 1;
                    (next_key, rng.gen_range_u32(10, 40))
                })
                .collect()
        };
        let initial = fresh(&mut rng, 120);
        let mut r = keyed_repeater(&world, initial);
        let mut pins: Vec<ElementId> = Vec::new();

        for _ in 0..300 {
            let count = r.items().count();
            match rng.gen_range_u32(0, 11) {
                0 | 1 => {
                    let start = rng.gen_range_u32(0, 3000) as f64;
                    layout_pass(&mut r, start, 100.0);
                    assert_settled(&r);
                }
                2 => {
                    let index = rng.gen_range_usize(0, count + 1);
                    let n = rng.gen_range_usize(1, 4);
                    let items = fresh(&mut rng, n);
                    r.insert_items(index, items).unwrap();
                }
                3 => {
                    let index = rng.gen_range_usize(0, count);
                    let n = rng.gen_range_usize(1, 4);
                    r.remove_items(index, n).unwrap();
                }
                4 => {
                    let index = rng.gen_range_usize(0, count);
                    let old = rng.gen_range_usize(1, 3);
                    let n = rng.gen_range_usize(0, 3);
                    let items = fresh(&mut rng, n);
                    r.replace_items(index, old, items).unwrap();
                }
                5 => {
                    let mut items = r.items().as_slice().to_vec();
                    for i in (1..items.len()).rev() {
                        let j = rng.gen_range_usize(0, i + 1);
                        items.swap(i, j);
                    }
                    if rng.gen_bool() {
                        items.truncate(items.len().saturating_sub(5));
                    }
                    if rng.gen_bool() {
                        let extra = fresh(&mut rng, 3);
                        items.extend(extra);
                    }
                    r.reset_items(items).unwrap();
                }
                6 => {
                    let realized = held(&r);
                    if !realized.is_empty() {
                        let (_, element) = realized[rng.gen_range_usize(0, realized.len())];
                        r.update_pin(element, true).unwrap();
                        pins.push(element);
                    }
                }
                7 => {
                    if !pins.is_empty() {
                        let element = pins.swap_remove(rng.gen_range_usize(0, pins.len()));
                        r.update_pin(element, false).unwrap();
                    }
                }
                8 => {
                    let realized = held(&r);
                    let focused = if realized.is_empty() || rng.gen_range_u32(0, 4) == 0 {
                        None
                    } else {
                        Some(realized[rng.gen_range_usize(0, realized.len())].1)
                    };
                    r.on_focus_changed(focused).unwrap();
                }
                9 => {
                    let index = rng.gen_range_usize(0, count);
                    r.get_or_create_element(index).unwrap();
                }
                10 => {
                    let spacing = rng.gen_range_u32(0, 4) as f64;
                    r.set_layout(Some(StackLayout::new().with_spacing(spacing).into()))
                        .unwrap();
                }
                _ => unreachable!(),
            }

            if r.items().count() < 20 {
                let at = r.items().count();
                let items = fresh(&mut rng, 30);
                r.insert_items(at, items).unwrap();
            }
            assert_consistent(&r, &world);
        }

        for element in pins.drain(..) {
            r.update_pin(element, false).unwrap();
        }
        r.on_focus_changed(None).unwrap();
        layout_pass(&mut r, 0.0, 100.0);
        layout_pass(&mut r, 0.0, 100.0);
        assert_settled(&r);
        assert_consistent(&r, &world);
        assert!(r.view_manager().pinned_elements().is_empty());
        let live = world.borrow().live.len();
        assert_eq!(live, held(&r).len());
    }
}
