// Example: a controller animating a long list towards a far item.
use std::collections::HashMap;

use repeater::{
    ElementFactory, ElementFactoryGetArgs, ElementFactoryRecycleArgs, ElementId, ItemsRepeater,
    ItemsSourceView, Rect, Size, StackLayout, VisualHost,
};
use repeater_adapter::{Controller, Easing, ViewportManager};

#[derive(Default)]
struct Pool {
    next: u64,
    free: Vec<ElementId>,
}

impl ElementFactory<u32> for Pool {
    fn get_element(&mut self, _args: ElementFactoryGetArgs<'_, u32>) -> Option<ElementId> {
        Some(self.free.pop().unwrap_or_else(|| {
            self.next += 1;
            ElementId(100 + self.next)
        }))
    }

    fn recycle_element(&mut self, args: ElementFactoryRecycleArgs) {
        self.free.push(args.element);
    }
}

/// Row heights alternate between 18 and 30 so the size estimate has to settle.
#[derive(Default)]
struct Host {
    parents: HashMap<ElementId, ElementId>,
}

impl VisualHost for Host {
    fn attach_child(&mut self, parent: ElementId, child: ElementId) {
        self.parents.insert(child, parent);
    }

    fn detach_child(&mut self, _parent: ElementId, child: ElementId) {
        self.parents.remove(&child);
    }

    fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.parents.get(&element).copied()
    }

    fn measure(&mut self, element: ElementId, available: Size) -> Size {
        let height = if element.0 % 2 == 0 { 18.0 } else { 30.0 };
        Size::new(available.width.min(400.0), height)
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

fn main() -> repeater::Result<()> {
    // An adapter would:
    // - report viewport size and user scrolling
    // - call tick(now_ms) in a frame loop and apply the returned offset to its scroll container
    // - render the repeater's children at their arranged bounds
    let mut list = ItemsRepeater::<u32>::new(
        ElementId(1),
        ItemsSourceView::new((0..50_000u32).collect()),
        Pool::default(),
        Host::default(),
    );
    list.set_layout(Some(StackLayout::new().into()))?;

    let mut c = Controller::new(list, ViewportManager::new());
    c.on_viewport_size(Size::new(400.0, 600.0));
    c.tick(0)?;

    let target = c.bring_into_view(20_000, 0, 240, Easing::EaseInOutCubic)?;
    println!("target_offset={target}");

    let mut now_ms = 0u64;
    while c.is_animating() {
        now_ms += 16;
        if let Some(offset) = c.tick(now_ms)? {
            if now_ms % 80 == 0 {
                println!(
                    "t={now_ms} offset={offset:.1} realized={:?}",
                    c.repeater().view_manager().realized_range()
                );
            }
        }
    }

    println!(
        "done: offset={:.1} realized={:?} children={}",
        c.scroll_offset(),
        c.repeater().view_manager().realized_range(),
        c.repeater().children().len()
    );
    Ok(())
}
