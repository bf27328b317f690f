// THEORY:
// External contour extraction for binary masks. This is the spatial grouping
// step: it turns a cleaned foreground mask into a list of outer borders, one
// per outermost connected region.
//
// Algorithm:
// 1.  **Outside Region**: Background pixels reachable from the image border
//     (4-connected) are "outside". Everything else that is background is a hole.
// 2.  **Component Growing**: Raster-scan for unvisited foreground pixels and
//     grow each into its full 8-connected region with a work list.
// 3.  **External Filter**: A region is external when its first raster pixel
//     touches the image edge or sits directly under an outside pixel. Regions
//     nested inside another region's hole are skipped.
// 4.  **Border Tracing**: External regions are traced clockwise with Moore
//     neighbour tracing, giving the polygon used for area and bounding box.
//
// Output order is the raster order of each region's first pixel. The blob
// extractor numbers slots in this order.

pub mod contours {
    use crate::core_modules::blob::BoundingBox;
    use image::GrayImage;
    use std::collections::VecDeque;

    /// A pixel coordinate on the mask.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Point {
        pub x: u32,
        pub y: u32,
    }

    /// Clockwise neighbour order on screen (y grows downwards), starting east.
    const DIRECTIONS: [(i32, i32); 8] = [
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
    ];
    const WEST: usize = 4;

    /// The outer border of one connected foreground region.
    #[derive(Debug, Clone, PartialEq)]
    pub struct Contour {
        /// Border pixels in tracing order. A border pixel may repeat when the
        /// region is only one pixel thick there.
        pub points: Vec<Point>,
    }

    impl Contour {
        /// Polygon area enclosed by the border points (shoelace formula).
        /// Single pixels and one-pixel-wide lines have zero area.
        pub fn area(&self) -> f64 {
            let n = self.points.len();
            if n < 3 {
                return 0.0;
            }
            let mut twice = 0.0f64;
            for i in 0..n {
                let a = self.points[i];
                let b = self.points[(i + 1) % n];
                twice += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
            }
            twice.abs() / 2.0
        }

        pub fn bounding_box(&self) -> BoundingBox {
            let mut min_x = u32::MAX;
            let mut min_y = u32::MAX;
            let mut max_x = 0;
            let mut max_y = 0;
            for p in &self.points {
                min_x = min_x.min(p.x);
                min_y = min_y.min(p.y);
                max_x = max_x.max(p.x);
                max_y = max_y.max(p.y);
            }
            BoundingBox::from_corners(min_x, min_y, max_x, max_y)
        }
    }

    /// Finds the outer contour of every outermost foreground region.
    /// Any non-zero pixel is foreground.
    pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour> {
        let (width, height) = mask.dimensions();
        let grid = Grid::new(mask);
        let outside = outside_background(&grid);
        let mut visited = vec![false; grid.len()];
        let mut contours = Vec::new();

        for y in 0..height {
            for x in 0..width {
                let index = grid.index(x, y);
                if !grid.fg[index] || visited[index] {
                    continue;
                }

                let region_len = grow_region(&grid, &mut visited, Point { x, y });
                let is_external = x == 0 || y == 0 || outside[grid.index(x, y - 1)];
                if is_external {
                    contours.push(trace_border(&grid, Point { x, y }, region_len));
                }
            }
        }

        contours
    }

    struct Grid {
        width: u32,
        height: u32,
        fg: Vec<bool>,
    }

    impl Grid {
        fn new(mask: &GrayImage) -> Self {
            let (width, height) = mask.dimensions();
            Self {
                width,
                height,
                fg: mask.pixels().map(|p| p[0] > 0).collect(),
            }
        }

        fn len(&self) -> usize {
            self.fg.len()
        }

        fn index(&self, x: u32, y: u32) -> usize {
            (y * self.width + x) as usize
        }

        fn neighbour(&self, p: Point, direction: usize) -> Option<Point> {
            let (dx, dy) = DIRECTIONS[direction];
            let nx = p.x as i32 + dx;
            let ny = p.y as i32 + dy;
            if nx >= 0 && nx < self.width as i32 && ny >= 0 && ny < self.height as i32 {
                Some(Point { x: nx as u32, y: ny as u32 })
            } else {
                None
            }
        }

        fn is_fg(&self, p: Point) -> bool {
            self.fg[self.index(p.x, p.y)]
        }
    }

    /// Marks background pixels 4-connected to the image border.
    fn outside_background(grid: &Grid) -> Vec<bool> {
        let mut outside = vec![false; grid.len()];
        let mut queue = VecDeque::new();

        let seed = |x: u32, y: u32, outside: &mut Vec<bool>, queue: &mut VecDeque<Point>| {
            let index = grid.index(x, y);
            if !grid.fg[index] && !outside[index] {
                outside[index] = true;
                queue.push_back(Point { x, y });
            }
        };
        for x in 0..grid.width {
            seed(x, 0, &mut outside, &mut queue);
            seed(x, grid.height.saturating_sub(1), &mut outside, &mut queue);
        }
        for y in 0..grid.height {
            seed(0, y, &mut outside, &mut queue);
            seed(grid.width.saturating_sub(1), y, &mut outside, &mut queue);
        }

        while let Some(current) = queue.pop_front() {
            // Even directions are the four orthogonal neighbours.
            for direction in (0..8).step_by(2) {
                if let Some(next) = grid.neighbour(current, direction) {
                    let index = grid.index(next.x, next.y);
                    if !grid.fg[index] && !outside[index] {
                        outside[index] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        outside
    }

    /// Flood-grows one 8-connected region from `seed`. Returns its pixel count.
    fn grow_region(grid: &Grid, visited: &mut [bool], seed: Point) -> usize {
        let mut queue = vec![seed];
        visited[grid.index(seed.x, seed.y)] = true;
        let mut count = 0;

        while let Some(current) = queue.pop() {
            count += 1;
            for direction in 0..8 {
                if let Some(next) = grid.neighbour(current, direction) {
                    let index = grid.index(next.x, next.y);
                    if grid.fg[index] && !visited[index] {
                        visited[index] = true;
                        queue.push(next);
                    }
                }
            }
        }
        count
    }

    /// Searches clockwise around `p`, starting just after `backtrack`, for the
    /// next foreground pixel. Returns the pixel and the direction taken.
    fn next_on_border(grid: &Grid, p: Point, backtrack: usize) -> Option<(Point, usize)> {
        (1..=8).find_map(|k| {
            let direction = (backtrack + k) % 8;
            grid.neighbour(p, direction)
                .filter(|&q| grid.is_fg(q))
                .map(|q| (q, direction))
        })
    }

    /// Direction from the newly reached pixel back to the last background
    /// pixel examined before it.
    fn backtrack_after(direction: usize) -> usize {
        if direction % 2 == 0 {
            (direction + 6) % 8
        } else {
            (direction + 5) % 8
        }
    }

    /// Moore neighbour tracing. `start` must be the region's first pixel in
    /// raster order, so its west neighbour is background.
    fn trace_border(grid: &Grid, start: Point, region_len: usize) -> Contour {
        let mut points = vec![start];
        let Some((second, first_direction)) = next_on_border(grid, start, WEST) else {
            return Contour { points };
        };

        let mut current = second;
        let mut direction = first_direction;
        // A border visits each pixel at most a handful of times.
        let limit = region_len * 8 + 8;
        for _ in 0..limit {
            let Some((next, next_direction)) = next_on_border(grid, current, backtrack_after(direction)) else {
                break;
            };
            if current == start && next == second {
                break;
            }
            points.push(current);
            current = next;
            direction = next_direction;
        }
        Contour { points }
    }

}
