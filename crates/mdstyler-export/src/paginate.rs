//! Page break placement.

use crate::layout::FlowBlock;

/// Overflow tolerated before a block is pushed to the next page.
const EPSILON: f64 = 0.5;

/// Top offset of every page, first page at `0.0`.
///
/// Blocks chained by `keep_with_next` move together. A group that
/// overflows starts a new page at its top when it fits on one page;
/// otherwise it is broken between its blocks, and a single block taller
/// than a page is sliced at page boundaries.
pub(crate) fn page_starts(blocks: &[FlowBlock], page_height: f64) -> Vec<f64> {
    let mut starts = vec![0.0];
    if page_height <= 0.0 {
        return starts;
    }

    let mut page_start = 0.0;
    let mut pending_break = false;
    let mut index = 0;

    while index < blocks.len() {
        let mut end = index;
        while end + 1 < blocks.len() && blocks[end].keep_with_next {
            end += 1;
        }
        let group = &blocks[index..=end];
        let top = group[0].top;
        let bottom = group.iter().map(|block| block.bottom).fold(top, f64::max);

        if (pending_break || group[0].break_before) && top > page_start {
            page_start = top;
            starts.push(page_start);
        }
        pending_break = group.iter().any(|block| block.break_after);

        if bottom - page_start > page_height + EPSILON {
            if top > page_start && bottom - top <= page_height + EPSILON {
                page_start = top;
                starts.push(page_start);
            } else {
                for block in group {
                    while block.bottom - page_start > page_height + EPSILON {
                        page_start = if block.top > page_start {
                            block.top
                        } else {
                            page_start + page_height
                        };
                        starts.push(page_start);
                    }
                }
            }
        }

        index = end + 1;
    }

    starts
}
