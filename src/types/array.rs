use super::{XdmItem, XdmValue};
use std::fmt;
use std::hash::{Hash, Hasher};

/// An XDM array. Members are whole sequences; all accessors are 1-based,
/// matching the `array:*` function surface.
#[derive(Debug, Clone)]
pub struct XdmArray<N> {
    members: Vec<XdmValue<N>>,
}

impl<N: Clone> XdmArray<N> {
    pub fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    pub fn from_members(members: Vec<XdmValue<N>>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[XdmValue<N>] {
        &self.members
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&XdmValue<N>> {
        if index == 0 {
            return None;
        }
        self.members.get(index - 1)
    }

    pub fn put(&self, index: usize, value: XdmValue<N>) -> Option<Self> {
        if index == 0 || index > self.members.len() {
            return None;
        }
        let mut new_arr = self.clone();
        new_arr.members[index - 1] = value;
        Some(new_arr)
    }

    pub fn append(&self, value: XdmValue<N>) -> Self {
        let mut new_arr = self.clone();
        new_arr.members.push(value);
        new_arr
    }

    pub fn insert_before(&self, index: usize, value: XdmValue<N>) -> Option<Self> {
        if index == 0 || index > self.members.len() + 1 {
            return None;
        }
        let mut new_arr = self.clone();
        new_arr.members.insert(index - 1, value);
        Some(new_arr)
    }

    pub fn remove(&self, index: usize) -> Option<Self> {
        if index == 0 || index > self.members.len() {
            return None;
        }
        let mut new_arr = self.clone();
        new_arr.members.remove(index - 1);
        Some(new_arr)
    }

    pub fn subarray(&self, start: usize, length: usize) -> Option<Self> {
        if start == 0 || start > self.members.len() + 1 {
            return None;
        }
        let end = std::cmp::min(start - 1 + length, self.members.len());
        Some(Self::from_members(self.members[start - 1..end].to_vec()))
    }

    pub fn head(&self) -> Option<&XdmValue<N>> {
        self.members.first()
    }

    pub fn tail(&self) -> Option<Self> {
        if self.members.is_empty() {
            return None;
        }
        Some(Self::from_members(self.members[1..].to_vec()))
    }

    pub fn reverse(&self) -> Self {
        let mut reversed = self.members.clone();
        reversed.reverse();
        Self::from_members(reversed)
    }

    pub fn join(arrays: &[XdmArray<N>]) -> Self {
        let total: usize = arrays.iter().map(|a| a.members.len()).sum();
        let mut result = Vec::with_capacity(total);
        for arr in arrays {
            result.extend(arr.members.iter().cloned());
        }
        Self::from_members(result)
    }

    /// Flattens the array into one sequence of items, recursing into
    /// nested arrays.
    pub fn flatten(&self) -> Vec<XdmItem<N>> {
        let mut out = Vec::new();
        for member in &self.members {
            for item in member.items() {
                match item {
                    XdmItem::Array(inner) => out.extend(inner.flatten()),
                    other => out.push(other.clone()),
                }
            }
        }
        out
    }
}

impl<N: Clone> Default for XdmArray<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: PartialEq + Clone> PartialEq for XdmArray<N> {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
    }
}

impl<N: Eq + Clone> Eq for XdmArray<N> {}

impl<N: Hash + Clone> Hash for XdmArray<N> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.members.len().hash(state);
        for member in &self.members {
            member.hash(state);
        }
    }
}

impl<N: fmt::Debug + Clone> fmt::Display for XdmArray<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for member in &self.members {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
            first = false;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arr(values: &[i64]) -> XdmArray<()> {
        XdmArray::from_members(values.iter().map(|&i| XdmValue::from_integer(i)).collect())
    }

    #[test]
    fn test_one_based_access() {
        let a = arr(&[10, 20, 30]);
        assert_eq!(a.get(1), Some(&XdmValue::from_integer(10)));
        assert_eq!(a.get(3), Some(&XdmValue::from_integer(30)));
        assert_eq!(a.get(0), None);
        assert_eq!(a.get(4), None);
    }

    #[test]
    fn test_append_and_remove() {
        let a = arr(&[1, 2]).append(XdmValue::from_integer(3));
        assert_eq!(a.size(), 3);
        let a = a.remove(1).unwrap();
        assert_eq!(a.get(1), Some(&XdmValue::from_integer(2)));
    }

    #[test]
    fn test_flatten_recurses() {
        let inner = arr(&[2, 3]);
        let outer: XdmArray<()> = XdmArray::from_members(vec![
            XdmValue::from_integer(1),
            XdmValue::from_item(XdmItem::Array(inner)),
        ]);
        assert_eq!(outer.flatten().len(), 3);
    }
}
