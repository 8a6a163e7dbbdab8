// Example: a vertical list of 100k rows backed by a handful of recycled elements.
use std::collections::HashMap;

use repeater::{
    ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, ElementId, ItemsRepeater,
    ItemsSourceView, Rect, Size, StackLayout, VisualHost,
};

/// Hands out element ids and keeps recycled ones for reuse.
#[derive(Default)]
struct RowFactory {
    next: u64,
    free: Vec<ElementId>,
}

impl ElementFactory<String> for RowFactory {
    fn get_element(&mut self, args: ElementFactoryGetArgs<'_, String>) -> Option<ElementId> {
        let element = self.free.pop().unwrap_or_else(|| {
            self.next += 1;
            ElementId(100 + self.next)
        });
        // A real factory would bind `args.data` to the element here.
        let _ = args.data;
        Some(element)
    }

    fn recycle_element(&mut self, args: ElementFactoryRecycleArgs) {
        self.free.push(args.element);
    }
}

/// Every row is 24 units tall; parents are tracked so pins can walk up the tree.
#[derive(Default)]
struct Tree {
    parents: HashMap<ElementId, ElementId>,
}

impl VisualHost for Tree {
    fn attach_child(&mut self, parent: ElementId, child: ElementId) {
        self.parents.insert(child, parent);
    }

    fn detach_child(&mut self, _parent: ElementId, child: ElementId) {
        self.parents.remove(&child);
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.parents.get(&element).copied()
    }

    fn measure(&mut self, _element: ElementId, available: Size) -> Size {
        Size::new(available.width.min(320.0), 24.0)
    }

    fn arrange(&mut self, _element: ElementId, _bounds: Rect) {}

    fn is_focusable(&self, _element: ElementId) -> bool {
        true
    }

    fn find_first_focusable(&self, subtree: ElementId) -> Option<ElementId> {
        Some(subtree)
    }

    fn find_last_focusable(&self, subtree: ElementId) -> Option<ElementId> {
        Some(subtree)
    }

    fn focus(&mut self, _element: ElementId) -> bool {
        true
    }
}

fn main() {
    let rows: Vec<String> = (0..100_000).map(|i| format!("row {i}")).collect();
    let mut list = ItemsRepeater::<String>::new(
        ElementId(1),
        ItemsSourceView::new(rows),
        RowFactory::default(),
        Tree::default(),
    );
    list.set_layout(Some(StackLayout::new().with_spacing(1.0).into()))
        .expect("no layout pass is running");

    for offset in [0.0, 240.0, 250_000.0, 2_000_000.0] {
        let window = Rect::new(0.0, offset, 320.0, 480.0);
        list.set_viewport(window, window);
        let desired = list
            .measure(Size::new(320.0, f64::INFINITY))
            .expect("measure");
        list.arrange(Size::new(320.0, desired.height)).expect("arrange");

        println!(
            "offset={offset} extent={} realized={:?} children={}",
            desired.height,
            list.view_manager().realized_range(),
            list.children().len()
        );
    }

    // Bring a far item in: the next measure starts from it.
    let anchor = list.get_or_create_element(75_000).expect("anchor");
    println!(
        "anchor={anchor:?} index={:?}",
        list.get_element_index(anchor).expect("known element")
    );
}
