/// A tree of rows, used to display accounts under their parents.
/// Each node stores its key (in general an AccountId) and the data computed
/// for it (balance, totals,...).

pub struct NodeData<K, T> {
    pub key: K,
    pub data: T,

    // The depth of the node in the tree, starting at 0 for root nodes
    pub depth: usize,
}

pub struct TreeNode<K, T> {
    children: Vec<TreeNode<K, T>>,
    pub data: NodeData<K, T>,
}

impl<K, T> TreeNode<K, T> {
    fn new(key: K, data: T, depth: usize) -> Self {
        Self {
            children: Vec::new(),
            data: NodeData { key, data, depth },
        }
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Iterate over direct children
    pub fn iter_children(&self) -> impl Iterator<Item = &TreeNode<K, T>> {
        self.children.iter()
    }
}

pub struct Tree<K, T> {
    roots: Vec<TreeNode<K, T>>,
}

impl<K, T> Default for Tree<K, T> {
    fn default() -> Self {
        Self { roots: Vec::new() }
    }
}

fn find_or_create<'a, K: PartialEq + Clone, T, F>(
    nodes: &'a mut Vec<TreeNode<K, T>>,
    key: &K,
    create: &mut F,
    depth: usize,
) -> &'a mut TreeNode<K, T>
where
    F: FnMut(&K) -> T,
{
    // Go through an index to avoid issues with the borrow checker
    let idx = match nodes.iter().position(|n| n.data.key == *key) {
        Some(i) => i,
        None => {
            nodes.push(TreeNode::new(key.clone(), create(key), depth));
            nodes.len() - 1
        }
    };
    let len = nodes.len();
    nodes
        .get_mut(idx)
        .unwrap_or_else(|| unreachable!("index {idx} out of {len}"))
}

impl<K: PartialEq + Clone, T> Tree<K, T> {
    /// Return the data for the given key, creating the node and all its
    /// parents as needed.
    pub fn get_or_create<F>(
        &mut self,
        key: &K,
        parents: impl Iterator<Item = K>, // immediate parent is first
        mut create: F,
    ) -> &mut T
    where
        F: FnMut(&K) -> T,
    {
        let parents: Vec<K> = parents.collect();
        let mut current = &mut self.roots;
        for (depth, p) in parents.iter().rev().enumerate() {
            current = &mut find_or_create(current, p, &mut create, depth)
                .children;
        }
        &mut find_or_create(current, key, &mut create, parents.len())
            .data
            .data
    }
}

impl<K, T> Tree<K, T> {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Sort siblings, recursively
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&NodeData<K, T>, &NodeData<K, T>) -> std::cmp::Ordering,
    {
        fn sort_nodes<K, T, F>(nodes: &mut [TreeNode<K, T>], cmp: &mut F)
        where
            F: FnMut(&NodeData<K, T>, &NodeData<K, T>) -> std::cmp::Ordering,
        {
            nodes.sort_by(|n1, n2| cmp(&n1.data, &n2.data));
            for node in nodes.iter_mut() {
                sort_nodes(&mut node.children, cmp);
            }
        }
        sort_nodes(&mut self.roots, &mut cmp);
    }

    /// First remove unwanted children, then look at the node itself, so that
    /// the filter can find out whether there remains any children
    pub fn retain<F>(&mut self, mut filter: F)
    where
        F: FnMut(&TreeNode<K, T>) -> bool,
    {
        fn retain_nodes<K, T, F>(nodes: &mut Vec<TreeNode<K, T>>, filter: &mut F)
        where
            F: FnMut(&TreeNode<K, T>) -> bool,
        {
            for node in nodes.iter_mut() {
                retain_nodes(&mut node.children, filter);
            }
            nodes.retain(|node| filter(node));
        }
        retain_nodes(&mut self.roots, &mut filter);
    }

    /// Recursively traverse all nodes, parents before their children.
    pub fn traverse<F>(&self, mut process: F)
    where
        F: FnMut(&TreeNode<K, T>),
    {
        fn visit<K, T, F>(nodes: &[TreeNode<K, T>], process: &mut F)
        where
            F: FnMut(&TreeNode<K, T>),
        {
            for node in nodes {
                process(node);
                visit(&node.children, process);
            }
        }
        visit(&self.roots, &mut process);
    }
}

impl<K, T> Tree<K, T>
where
    T: Clone + for<'a> core::ops::AddAssign<&'a T>,
{
    /// Add the children's data into their parent, so that each node shows
    /// the total for its whole subtree.
    pub fn cumulate(&mut self) {
        fn cumulate_nodes<K, T>(nodes: &mut [TreeNode<K, T>])
        where
            T: Clone + for<'a> core::ops::AddAssign<&'a T>,
        {
            for node in nodes.iter_mut() {
                cumulate_nodes(&mut node.children);
                for child in &node.children {
                    let d = child.data.data.clone();
                    node.data.data += &d;
                }
            }
        }
        cumulate_nodes(&mut self.roots);
    }
}

#[cfg(test)]
mod test {
    use crate::trees::Tree;

    #[test]
    fn test_tree() {
        let mut tree: Tree<&str, i32> = Tree::default();
        *tree.get_or_create(&"checking", ["bank", "assets"].into_iter(), |_| 0) += 10;
        *tree.get_or_create(&"savings", ["bank", "assets"].into_iter(), |_| 0) += 5;
        *tree.get_or_create(&"assets", std::iter::empty(), |_| 0) += 1;
        *tree.get_or_create(&"loan", ["liabilities"].into_iter(), |_| 0) += 0;

        tree.retain(|node| node.has_children() || node.data.data != 0);
        tree.cumulate();
        tree.sort_by(|a, b| a.key.cmp(b.key));

        let mut rows = Vec::new();
        tree.traverse(|node| {
            rows.push((node.data.key, node.data.data, node.data.depth))
        });
        assert_eq!(
            rows,
            vec![
                ("assets", 16, 0),
                ("bank", 15, 1),
                ("checking", 10, 2),
                ("savings", 5, 2),
            ]
        );
    }
}
