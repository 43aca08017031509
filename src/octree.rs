use crate::error::Error;
use crate::pal::{is_transparent, unpack, PalIndex, Palette, MAX_COLORS};

/// Nodes live in an arena owned by the tree; child slots and the reducible
/// candidate lists hold indices, never references.
type NodeId = usize;

/// Depth of the deepest addressable trie level. Levels 0..=6 consume one
/// 3-bit octant code each; level-7 nodes are terminal buckets.
const MAX_LEVEL: u8 = 7;

struct Node {
    level: u8,
    is_leaf: bool,
    reducible: bool,
    pixel_count: u64,
    r_sum: u64,
    g_sum: u64,
    b_sum: u64,
    children: [Option<NodeId>; 8],
    palette_index: PalIndex,
}

impl Node {
    fn new(level: u8) -> Self {
        Self {
            level,
            is_leaf: false,
            reducible: false,
            pixel_count: 0,
            r_sum: 0,
            g_sum: 0,
            b_sum: 0,
            children: [None; 8],
            palette_index: 0,
        }
    }

    /// Mean of all colors accumulated into this bucket, per channel rounded.
    fn mean_color(&self) -> crate::RGBA {
        debug_assert!(self.pixel_count > 0);
        let half = self.pixel_count / 2;
        crate::RGBA {
            r: ((self.r_sum + half) / self.pixel_count) as u8,
            g: ((self.g_sum + half) / self.pixel_count) as u8,
            b: ((self.b_sum + half) / self.pixel_count) as u8,
            a: 255,
        }
    }
}

/// One bit from each of R, G, B at this depth, MSB-first.
#[inline(always)]
fn child_slot(r: u8, g: u8, b: u8, level: u8) -> usize {
    let pos = MAX_LEVEL - level;
    (((r >> pos) & 1) << 2 | ((g >> pos) & 1) << 1 | ((b >> pos) & 1)) as usize
}

/// Frequency-weighted octree over the 24-bit RGB cube.
///
/// Streams pixels in, keeps the live leaf count at or below the configured
/// budget by merging the deepest, most populated subtrees, and serializes
/// the surviving leaves into a [`Palette`].
pub struct ColorOctree {
    nodes: Vec<Node>,
    /// Ids of collapsed nodes, reused by later insertions
    free: Vec<NodeId>,
    root: NodeId,
    max_colors: usize,
    /// Insertion stops at this depth. Only ever decreases.
    leaf_level: u8,
    num_leaves: usize,
    has_alpha: bool,
    any_added: bool,
    /// Merge candidates, one list per depth, in registration order
    reducible: [Vec<NodeId>; 8],
    /// Palette entry count (incl. the transparent slot) once serialized
    built_len: Option<usize>,
}

impl ColorOctree {
    pub fn new(max_colors: usize) -> Result<Self, Error> {
        if max_colors < 1 || max_colors > MAX_COLORS {
            return Err(Error::InvalidArgument);
        }
        let mut tree = Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: 0,
            max_colors,
            leaf_level: MAX_LEVEL,
            num_leaves: 0,
            has_alpha: false,
            any_added: false,
            reducible: Default::default(),
            built_len: None,
        };
        tree.nodes.push(Node::new(0));
        Ok(tree)
    }

    /// Live quantization buckets.
    #[inline]
    #[must_use]
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Whether a fully transparent pixel has been seen.
    #[inline]
    #[must_use]
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Slots left for opaque colors once transparency reserves one.
    fn budget(&self) -> usize {
        (self.max_colors - usize::from(self.has_alpha)).max(1)
    }

    /// Absorbs one `0xAARRGGBB` pixel. Never fails; when the leaf budget is
    /// exceeded the deepest candidate subtrees are merged synchronously.
    pub fn add_color(&mut self, color: u32) {
        self.any_added = true;
        if is_transparent(color) {
            // Transparency reserves a palette slot, not a trie leaf.
            // Only the first occurrence changes anything.
            if !self.has_alpha {
                self.has_alpha = true;
                while self.num_leaves > self.budget() && self.reduce_once() {}
            }
            return;
        }
        let px = unpack(color);
        let delta = self.insert_at(self.root, px.r, px.g, px.b);
        self.apply_leaf_delta(delta);
        while self.num_leaves > self.budget() && self.reduce_once() {}
    }

    /// Absorbs a row of pixels.
    pub fn add_colors(&mut self, colors: &[u32]) {
        for &color in colors {
            self.add_color(color);
        }
    }

    fn apply_leaf_delta(&mut self, delta: i32) {
        self.num_leaves = (self.num_leaves as i64 + i64::from(delta)) as usize;
    }

    /// Returns the change in total leaf count.
    fn insert_at(&mut self, id: NodeId, r: u8, g: u8, b: u8) -> i32 {
        let node = &mut self.nodes[id];
        node.pixel_count += 1;
        node.r_sum += u64::from(r);
        node.g_sum += u64::from(g);
        node.b_sum += u64::from(b);
        if node.is_leaf {
            return 0;
        }
        if node.level >= self.leaf_level {
            return self.make_leaf(id);
        }
        let level = node.level;
        let slot = child_slot(r, g, b, level);
        let child = match self.nodes[id].children[slot] {
            Some(child) => child,
            None => {
                let child = self.alloc(level + 1);
                let node = &mut self.nodes[id];
                let first_child = node.children.iter().all(Option::is_none);
                node.children[slot] = Some(child);
                // The node just gained its first leaf descendant, making it
                // a merge candidate. Re-registration is skipped.
                if first_child && !node.reducible {
                    node.reducible = true;
                    self.reducible[level as usize].push(id);
                }
                child
            }
        };
        self.insert_at(child, r, g, b)
    }

    /// Turns `id` into a terminal bucket, folding in any subtree that was
    /// built before `leaf_level` dropped beneath it. The node's running
    /// sums already cover every pixel inserted through it, so children are
    /// discarded, not re-added.
    fn make_leaf(&mut self, id: NodeId) -> i32 {
        let mut swallowed = 0usize;
        for slot in 0..8 {
            if let Some(child) = self.nodes[id].children[slot].take() {
                swallowed += self.free_subtree(child);
            }
        }
        self.unregister(id);
        self.nodes[id].is_leaf = true;
        1 - swallowed as i32
    }

    /// Recycles a whole subtree, returning how many leaves it held.
    fn free_subtree(&mut self, id: NodeId) -> usize {
        let children = std::mem::replace(&mut self.nodes[id].children, [None; 8]);
        let mut leaves = usize::from(self.nodes[id].is_leaf);
        self.unregister(id);
        self.free.push(id);
        for child in children.into_iter().flatten() {
            leaves += self.free_subtree(child);
        }
        leaves
    }

    fn unregister(&mut self, id: NodeId) {
        if self.nodes[id].reducible {
            self.nodes[id].reducible = false;
            let level = self.nodes[id].level as usize;
            self.reducible[level].retain(|&n| n != id);
        }
    }

    /// One reduction pass: collapse the best candidate at the deepest
    /// populated level. Returns false when no candidate exists.
    fn reduce_once(&mut self) -> bool {
        let level = match (0..self.leaf_level as usize).rev().find(|&d| !self.reducible[d].is_empty()) {
            Some(level) => level,
            None => return false,
        };
        // Largest accumulated pixel count wins; it approximates a single
        // dominant color and merges with the least visible banding.
        // Ties keep the first-registered node.
        let mut best = 0;
        let mut best_count = self.nodes[self.reducible[level][0]].pixel_count;
        for (i, &id) in self.reducible[level].iter().enumerate().skip(1) {
            let count = self.nodes[id].pixel_count;
            if count > best_count {
                best = i;
                best_count = count;
            }
        }
        let id = self.reducible[level].remove(best);
        self.nodes[id].reducible = false;
        let delta = self.make_leaf(id);
        self.apply_leaf_delta(delta);
        // Future insertions stop one level above the merged subtree,
        // trading resolution for guaranteed bound compliance.
        let node_level = self.nodes[id].level;
        if node_level + 1 < self.leaf_level {
            self.leaf_level = node_level + 1;
        }
        true
    }

    /// Serializes all leaves into a palette, in stable left-to-right child
    /// order, assigning each leaf its index. Appends the reserved
    /// transparent entry when transparency was seen.
    ///
    /// Must run before [`quantize_color`](Self::quantize_color) is
    /// meaningful, because indices are assigned here.
    pub fn build_palette(&mut self) -> Result<Palette, Error> {
        if !self.any_added {
            return Err(Error::NotBuilt);
        }
        let mut pal = Palette::new();
        self.write_leaves(self.root, &mut pal);
        if self.has_alpha {
            pal.push_transparent();
        }
        self.built_len = Some(pal.len());
        Ok(pal)
    }

    fn write_leaves(&mut self, id: NodeId, pal: &mut Palette) {
        if self.nodes[id].is_leaf {
            if pal.len() >= self.max_colors {
                return;
            }
            let idx = pal.push(self.nodes[id].mean_color());
            self.nodes[id].palette_index = idx;
            return;
        }
        for slot in 0..8 {
            if let Some(child) = self.nodes[id].children[slot] {
                self.write_leaves(child, pal);
            }
        }
    }

    /// Resolves a color to the palette index of the bucket that owns it.
    ///
    /// This is trie ownership, not nearest-by-distance; a color that was
    /// never inserted descends through the closest occupied octants.
    pub fn quantize_color(&self, color: u32) -> Result<PalIndex, Error> {
        let built_len = self.built_len.ok_or(Error::NotBuilt)?;
        if is_transparent(color) && self.has_alpha {
            return Ok((built_len - 1) as PalIndex);
        }
        let px = unpack(color);
        let mut id = self.root;
        while !self.nodes[id].is_leaf {
            let slot = child_slot(px.r, px.g, px.b, self.nodes[id].level);
            id = match self.nodes[id].children[slot] {
                Some(child) => child,
                None => match self.nodes[id].children.iter().flatten().next() {
                    Some(&child) => child,
                    // Empty trie: only the transparent slot exists.
                    None => return Ok((built_len - 1) as PalIndex),
                },
            };
        }
        Ok(self.nodes[id].palette_index)
    }

    fn alloc(&mut self, level: u8) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id] = Node::new(level);
                id
            }
            None => {
                self.nodes.push(Node::new(level));
                self.nodes.len() - 1
            }
        }
    }
}
