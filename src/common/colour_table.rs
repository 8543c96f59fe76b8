use image::Rgb;

/// Display colour per class, fixed when the dispatcher starts.
///
/// Colours step linearly from magenta towards green across the class range.
#[derive(Debug, Clone, PartialEq)]
pub struct ColourTable {
    colours: Vec<Rgb<u8>>,
}

impl ColourTable {
    pub fn new(num_classes: usize) -> Self {
        let incr = 255 / num_classes.max(1);
        let colours = (0..num_classes)
            .map(|i| {
                let step = (incr * i).min(255) as u8;
                Rgb([255 - step, step, 255 - step])
            })
            .collect();
        Self { colours }
    }

    pub fn get(&self, class_id: usize) -> Option<Rgb<u8>> {
        self.colours.get(class_id).copied()
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_colour_per_class() {
        let table = ColourTable::new(80);
        assert_eq!(table.len(), 80);
        assert_eq!(table.get(0), Some(Rgb([255, 0, 255])));
        assert_eq!(table.get(1), Some(Rgb([252, 3, 252])));
        assert_eq!(table.get(80), None);
    }

    #[test]
    fn more_classes_than_steps() {
        let table = ColourTable::new(300);
        assert_eq!(table.get(299), Some(Rgb([255, 0, 255])));
    }
}
