//! Stop-the-world mark-and-sweep collection.
//!
//! Roots are the references held in the locals and operand stacks of every live frame, plus the
//! static fields of every loaded class. Marking follows references stored in object fields.

use std::collections::HashSet;

use crate::vm::heap::{Heap, ObjectId};
use crate::vm::method_area::MethodArea;
use crate::vm::thread::Thread;

/// Gathers every identity directly reachable from execution state.
pub fn collect_roots<'a, I>(threads: I, method_area: &MethodArea) -> Vec<ObjectId>
    where I: IntoIterator<Item = &'a Thread>
{
    let mut roots: Vec<ObjectId> = threads.into_iter().flat_map(Thread::references).collect();
    roots.extend(method_area.static_references());
    roots.sort();
    roots.dedup();
    roots
}

/// Returns the set of live objects reachable from `roots`. Roots that name no live object are
/// ignored.
pub fn mark(heap: &Heap, roots: &[ObjectId]) -> HashSet<ObjectId> {
    let mut marked = HashSet::new();
    let mut pending: Vec<ObjectId> = roots.to_vec();
    while let Some(id) = pending.pop() {
        if marked.contains(&id) {
            continue;
        }
        if let Ok(object) = heap.get(id) {
            marked.insert(id);
            pending.extend(object.references().filter(|r| !marked.contains(r)));
        }
    }
    debug!("marked {} of {} objects from {} roots", marked.len(), heap.live_count(), roots.len());
    marked
}

/// Frees every object not in `marked`. Returns the number of objects freed.
pub fn sweep(heap: &mut Heap, marked: &HashSet<ObjectId>) -> usize {
    let garbage: Vec<ObjectId> = heap.ids().filter(|id| !marked.contains(id)).collect();
    for &id in &garbage {
        debug!("swept {}", id);
        heap.free(id);
    }
    garbage.len()
}

/// Marks from `roots` and sweeps everything else.
pub fn collect(heap: &mut Heap, roots: &[ObjectId]) -> usize {
    let marked = mark(heap, roots);
    let freed = sweep(heap, &marked);
    info!("garbage collection freed {} objects, {} live", freed, heap.live_count());
    freed
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::HeapFault;
    use crate::vm::class::test::class_with_fields;
    use crate::vm::value::Value;

    #[test]
    fn unrooted_objects_are_freed() {
        let class = class_with_fields("Point", &[("x", "I")]);
        let mut heap = Heap::new(1000);
        let kept = heap.allocate(class.clone()).unwrap();
        let lost = heap.allocate(class).unwrap();

        assert_eq!(collect(&mut heap, &[kept]), 1);
        heap.set_field(kept, "x", Value::Int(4)).unwrap();
        assert_eq!(heap.get_field(kept, "x"), Ok(Value::Int(4)));
        assert_eq!(heap.get_field(lost, "x"), Err(HeapFault::NoSuchObject { id: lost }));
        assert_eq!(heap.set_field(lost, "x", Value::Int(1)),
                   Err(HeapFault::NoSuchObject { id: lost }));
    }

    #[test]
    fn marking_follows_fields() {
        let class = class_with_fields("Node", &[("next", "LNode;")]);
        let mut heap = Heap::new(1000);
        let a = heap.allocate(class.clone()).unwrap();
        let b = heap.allocate(class.clone()).unwrap();
        let c = heap.allocate(class.clone()).unwrap();
        let unreachable = heap.allocate(class).unwrap();
        heap.set_field(a, "next", Value::Reference(b)).unwrap();
        heap.set_field(b, "next", Value::Reference(c)).unwrap();
        // cycle back to the root
        heap.set_field(c, "next", Value::Reference(a)).unwrap();
        heap.set_field(unreachable, "next", Value::Reference(a)).unwrap();

        let marked = mark(&heap, &[a]);
        assert_eq!(marked.len(), 3);
        assert_eq!(sweep(&mut heap, &marked), 1);
        assert!(!heap.contains(unreachable));
        assert!(heap.contains(c));
    }

    #[test]
    fn stale_roots_are_ignored() {
        let class = class_with_fields("Point", &[]);
        let mut heap = Heap::new(1000);
        let a = heap.allocate(class).unwrap();
        assert_eq!(collect(&mut heap, &[ObjectId(5), ObjectId(2000)]), 1);
        assert_eq!(collect(&mut heap, &[a]), 0);
        assert_eq!(heap.live_count(), 0);
    }
}
