// Column positions in the lecture-plan grid. Any page redesign shifts these, so they
// come from configuration rather than being baked into the scanners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    pub semester: usize,
    pub year: usize,
    pub division: usize,
    pub code: usize,
    pub name: usize,
    pub credit: usize,
    pub professor: usize,
    pub time: usize,
    pub classroom: usize,
    pub room: usize,
    pub min_cells: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        GridLayout {
            semester: 2,
            year: 3,
            division: 4,
            code: 7,
            name: 8,
            credit: 9,
            professor: 12,
            time: 13,
            classroom: 15,
            room: 16,
            min_cells: 17,
        }
    }
}

impl GridLayout {
    fn highest_column(&self) -> usize {
        [
            self.semester,
            self.year,
            self.division,
            self.code,
            self.name,
            self.credit,
            self.professor,
            self.time,
            self.classroom,
            self.room,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }

    // A row is only read when every configured column exists in it.
    pub fn required_cells(&self) -> usize {
        self.min_cells.max(self.highest_column() + 1)
    }
}
